//! JSON codec shared by every decode path in the crate.
//!
//! [`JsonCodec`] is a stateless value constructed once per [`crate::Client`]
//! and handed to each component that serializes or deserializes. There is no
//! process-wide codec singleton; tests and embedders can pass their own
//! instance. The tree representation is [`serde_json::Value`], which already
//! guarantees that lookups on null or absent nodes yield `None` instead of
//! panicking.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Stateless JSON encoder/decoder.
///
/// Cloning is free; the codec is safe to share across concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    /// Serializes a value to a JSON string.
    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(Error::Encode)
    }

    /// Serializes a value to a JSON string, dropping `null` object entries
    /// at every nesting level.
    pub fn to_json_ignore_null<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut tree = self.value_to_tree(value)?;
        strip_nulls(&mut tree);
        serde_json::to_string(&tree).map_err(Error::Encode)
    }

    /// Deserializes a value from a JSON string.
    pub fn from_json<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(Error::Decode)
    }

    /// Parses a JSON string into a tree for discriminator inspection.
    pub fn parse_tree(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(Error::Decode)
    }

    /// Converts an already-structured value into a tree without going
    /// through a string.
    pub fn value_to_tree<T: Serialize>(&self, value: &T) -> Result<Value> {
        serde_json::to_value(value).map_err(Error::Encode)
    }

    /// Converts a tree node into a typed value.
    ///
    /// A null node yields `Ok(None)` rather than an error so that callers
    /// decoding optional `data` payloads never have to special-case it.
    pub fn tree_to_value<T: DeserializeOwned>(&self, node: &Value) -> Result<Option<T>> {
        if node.is_null() {
            return Ok(None);
        }
        serde_json::from_value(node.clone())
            .map(Some)
            .map_err(Error::Decode)
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_nulls(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_nulls(v);
            }
        }
        _ => {}
    }
}
