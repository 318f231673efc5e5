//! An async client for the [Dify](https://dify.ai) LLM application
//! platform.
//!
//! The crate wraps Dify's REST/SSE HTTP API behind typed request and
//! response structs. HTTP transport and JSON codec sit behind small
//! seams ([`http::HttpTransport`], [`codec::JsonCodec`]) so the endpoint
//! layer is independent of the underlying libraries; streaming endpoints
//! decode the Server-Sent-Events body into [`event::StreamEvent`] values
//! published as a [`futures::Stream`].
//!
//! # Blocking call
//!
//! ```no_run
//! use dify_api::{request, Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> dify_api::Result<()> {
//!     let client = Client::new("https://api.dify.ai", "API_KEY")?;
//!
//!     let data = request::ChatMessagesRequest {
//!         query: "What are the specs of the iPhone 13 Pro Max?".into(),
//!         user: "afa".into(),
//!         ..Default::default()
//!     };
//!     let result = client.api().chat_messages(data).await?;
//!     println!("{}", result.answer);
//!     Ok(())
//! }
//! ```
//!
//! # Streaming call
//!
//! ```no_run
//! use dify_api::{event::EventPayload, request, Client};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> dify_api::Result<()> {
//!     let client = Client::new("https://api.dify.ai", "API_KEY")?;
//!
//!     let data = request::ChatMessagesRequest {
//!         query: "Write a short poem about autumn.".into(),
//!         user: "afa".into(),
//!         ..Default::default()
//!     };
//!     let mut stream = client.api().chat_messages_stream(data).await?;
//!     while let Some(event) = stream.next().await {
//!         if let EventPayload::Message(chunk) = event?.payload {
//!             print!("{}", chunk.answer);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Dropping the stream cancels the request and closes the connection.
//! For the full endpoint list, see [`api::Api`].

pub mod api;
pub mod client;
pub mod codec;
pub mod error;
pub mod event;
pub mod http;
pub mod request;
pub mod response;
pub mod sse;
pub mod transport;

pub use client::{Client, Config};
pub use error::{Error, Result};
pub use sse::EventStream;
