//! Transport-agnostic HTTP layer.
//!
//! The API layer builds [`HttpRequest`] values and hands them to an
//! implementation of [`HttpTransport`]; nothing outside the `transport`
//! module mentions a concrete HTTP library. Adapters must not leak their
//! own request/response types through this boundary.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// HTTP request methods supported by the transport seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

/// Case-insensitive header multimap preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all values for the name with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.entries.push((name, value.into()));
    }

    /// First value for the name, matched case-insensitively.
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for the name in insertion order; empty if absent.
    pub fn get_or_empty(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_first(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One part of a multipart request body.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: PartContent,
}

/// Multipart part content: raw bytes for file uploads, text for
/// primitives and JSON-serialized values.
#[derive(Debug, Clone)]
pub enum PartContent {
    Bytes(Bytes),
    Text(String),
}

impl Part {
    /// A plain text part.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            content: PartContent::Text(value.into()),
        }
    }

    /// A file part with explicit filename and content type.
    pub fn bytes(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            content: PartContent::Bytes(data),
        }
    }
}

/// Request body shapes understood by every transport.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Pre-serialized JSON text; transports attach the content type.
    Json(String),
    Multipart(Vec<Part>),
}

/// A fully described HTTP request, independent of any transport library.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the `Authorization: Bearer <token>` header, replacing any
    /// previous value.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.headers
            .insert("Authorization", format!("Bearer {token}"));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: String) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn multipart(mut self, parts: Vec<Part>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }
}

/// A decoded HTTP response.
#[derive(Debug)]
pub struct HttpResponse<T> {
    pub status: u16,
    pub headers: Headers,
    pub body: T,
}

impl<T> HttpResponse<T> {
    /// True iff the status is in `[200, 300)`.
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn map_body<U>(self, f: impl FnOnce(T) -> U) -> HttpResponse<U> {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

/// Raw response body chunks from a streaming request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The seam between the API layer and a concrete HTTP library.
///
/// `execute` has blocking semantics: it resolves once the full body has
/// been received (or a transport error/timeout occurred). `execute_stream`
/// resolves as soon as response headers arrive and hands back the body as
/// a chunk stream.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse<Bytes>>;

    async fn execute_stream(&self, request: HttpRequest) -> Result<HttpResponse<ByteStream>>;
}

/// Default status handler evaluated before body decoding.
///
/// Returns the body text on 2xx; otherwise converts the status and body
/// into the matching typed error (401 unauthorized, 404 not found, other
/// statuses to API/status errors).
pub(crate) fn check_status(response: HttpResponse<Bytes>) -> Result<String> {
    let text = String::from_utf8_lossy(&response.body).into_owned();
    if response.is_successful() {
        Ok(text)
    } else {
        Err(Error::from_status(response.status, &text))
    }
}
