//! Client construction and configuration.
//!
//! [`Client`] owns the pieces every request needs: the configuration, the
//! transport behind the [`HttpTransport`] seam, and the [`JsonCodec`]
//! instance. All three are cheap to clone and safe to share across
//! concurrent requests.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dify_api::{Client, Config};
//!
//! let config = Config {
//!     base_url: "https://api.dify.ai".into(),
//!     api_key: "API_KEY".into(),
//!     ..Config::default()
//! };
//! let client = Client::new_with_config(config).unwrap();
//! let api = client.api();
//! ```

use crate::api::Api;
use crate::codec::JsonCodec;
use crate::error::Result;
use crate::http::HttpTransport;
use crate::transport::{ReqwestTransport, Timeouts};
use std::{sync::Arc, time::Duration};

/// Client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the Dify API, without a trailing slash.
    pub base_url: String,
    /// API key sent as a bearer token on every request.
    pub api_key: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.dify.ai".into(),
            api_key: String::new(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// A client for the Dify API.
#[derive(Clone)]
pub struct Client {
    pub config: Arc<Config>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) codec: JsonCodec,
}

impl Client {
    /// Creates a client with the default configuration for the given base
    /// URL and API key.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::new_with_config(Config {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Config::default()
        })
    }

    /// Creates a client from an explicit configuration, using the default
    /// `reqwest` transport.
    pub fn new_with_config(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(Timeouts {
            connect: config.connect_timeout,
            read: config.read_timeout,
            write: config.write_timeout,
        })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client over a caller-supplied transport. This is the
    /// composition point for alternative HTTP backends and for tests.
    pub fn with_transport(mut config: Config, transport: Arc<dyn HttpTransport>) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').into();
        Self {
            config: Arc::new(config),
            transport,
            codec: JsonCodec::new(),
        }
    }

    /// Returns the typed API surface bound to this client.
    pub fn api(&self) -> Api {
        Api::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_30s_timeouts() {
        let config = Config::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = Client::new("https://api.dify.ai/", "key").unwrap();
        assert_eq!(client.config.base_url, "https://api.dify.ai");
    }
}
