//! Error types for the Dify client.
//!
//! Every fallible operation in this crate returns [`Result`]. The error
//! kinds are deliberately coarse: callers branch on authorization and
//! not-found failures without parsing status codes themselves, everything
//! else carries enough context to log or surface.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serializing a request body to JSON failed.
    #[error("json encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Decoding a JSON response body failed.
    ///
    /// This is only raised for single-value bodies; a malformed payload on
    /// an SSE stream is logged and dropped instead (see the `sse` module).
    #[error("json decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The server answered 401.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The server answered 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The server answered with a non-2xx status and a parseable Dify
    /// error payload.
    #[error("api error (status {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The server answered with a non-2xx status and an opaque body.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// A connection-level failure (DNS, TLS, socket, mid-stream drop).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request was rejected before being sent (missing required
    /// fields, unsupported file content, malformed URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Error payload returned by the Dify API on failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub status: u16,
}

impl Display for ErrorResponse {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl Error {
    /// Maps a non-2xx response body to the matching error kind.
    ///
    /// 401 and 404 get dedicated variants; any other status becomes
    /// [`Error::Api`] when the body parses as a Dify error payload and
    /// [`Error::Status`] otherwise.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| body.to_owned());
        match status {
            401 => Error::Unauthorized { message },
            404 => Error::NotFound { message },
            _ => match parsed {
                Some(err) => Error::Api {
                    status,
                    code: err.code,
                    message: err.message,
                },
                None => Error::Status {
                    status,
                    body: body.to_owned(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_maps_to_unauthorized() {
        let body = r#"{"code":"unauthorized","message":"bad api key","status":401}"#;
        match Error::from_status(401, body) {
            Error::Unauthorized { message } => assert_eq!(message, "bad api key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_404_maps_to_not_found() {
        match Error::from_status(404, "no such app") {
            Error::NotFound { message } => assert_eq!(message, "no such app"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parseable_body_maps_to_api_error() {
        let body = r#"{"code":"app_unavailable","message":"App unavailable","status":400}"#;
        match Error::from_status(400, body) {
            Error::Api { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code, "app_unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn opaque_body_maps_to_status_error() {
        match Error::from_status(502, "<html>bad gateway</html>") {
            Error::Status { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
