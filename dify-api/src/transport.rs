//! `reqwest`-backed implementation of [`HttpTransport`].
//!
//! This is the only module allowed to name `reqwest` types. Errors are
//! translated into the crate's error kinds at the boundary and response
//! headers are copied into the crate's [`Headers`] multimap.

use crate::error::{Error, Result};
use crate::http::{
    Body, ByteStream, Headers, HttpRequest, HttpResponse, HttpTransport, Method, PartContent,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;

/// Connect/read/write timeouts fed to the transport (seconds, default 30
/// each via [`crate::client::Config`]).
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(30),
            write: Duration::from_secs(30),
        }
    }
}

/// Default transport, built on `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Client for single-body requests; carries a total request timeout.
    blocking: reqwest::Client,
    /// Client for SSE requests; only the connect timeout applies so a
    /// long-lived stream is not cut off by the total timeout.
    streaming: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: Timeouts) -> Result<Self> {
        // reqwest has no separate write timeout; the total timeout covers
        // request write plus response read.
        let total = timeouts.read + timeouts.write;
        let blocking = reqwest::ClientBuilder::new()
            .connect_timeout(timeouts.connect)
            .timeout(total)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let streaming = reqwest::ClientBuilder::new()
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            blocking,
            streaming,
        })
    }

    fn build(&self, client: &reqwest::Client, request: HttpRequest) -> Result<reqwest::Request> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        };
        let mut builder = client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(text) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(text),
            Body::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let piece = match part.content {
                        PartContent::Text(text) => reqwest::multipart::Part::text(text),
                        PartContent::Bytes(data) => reqwest::multipart::Part::stream(data),
                    };
                    let piece = match part.filename {
                        Some(filename) => piece.file_name(filename),
                        None => piece,
                    };
                    let piece = match part.content_type {
                        Some(mime) => piece
                            .mime_str(&mime)
                            .map_err(|e| Error::InvalidRequest(e.to_string()))?,
                        None => piece,
                    };
                    form = form.part(part.name, piece);
                }
                builder.multipart(form)
            }
        };
        builder.build().map_err(map_reqwest_error)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse<Bytes>> {
        let req = self.build(&self.blocking, request)?;
        let resp = self.blocking.execute(req).await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers = copy_headers(resp.headers());
        let body = resp.bytes().await.map_err(map_reqwest_error)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_stream(&self, request: HttpRequest) -> Result<HttpResponse<ByteStream>> {
        let req = self.build(&self.streaming, request)?;
        let resp = self
            .streaming
            .execute(req)
            .await
            .map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers = copy_headers(resp.headers());
        let body: ByteStream = Box::pin(
            resp.bytes_stream()
                .map(|chunk| chunk.map_err(map_reqwest_error)),
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn copy_headers(source: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in source.iter() {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }
    headers
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else if err.is_builder() {
        Error::InvalidRequest(err.to_string())
    } else {
        Error::Transport(err.to_string())
    }
}
