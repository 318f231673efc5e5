//! Server-Sent Events stream reader.
//!
//! Turns the raw byte stream of a `text/event-stream` response into a
//! sequence of decoded [`StreamEvent`]s. The reader owns one
//! [`SseFrameDecoder`] per streaming call; frames are decoded on a spawned
//! task and published on a bounded channel, so the caller gets a
//! [`futures::Stream`] handle back immediately and items are pushed as
//! they arrive, in frame order.
//!
//! Error policy: a single event that fails to parse as JSON is logged and
//! dropped, and the stream continues. A transport-level chunk error is
//! forwarded as an `Err` item and terminates the stream. Natural end of
//! the byte stream closes the channel, which the consumer observes as
//! completion. Dropping the [`EventStream`] closes the channel from the
//! consumer side; the decode task then returns and releases the
//! underlying connection.

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::event::{decode_stream_event, StreamEvent};
use crate::http::ByteStream;
use bytes::BytesMut;
use futures::{Stream, StreamExt};
use std::fmt;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Bounded capacity between the decode task and the consumer. Small on
/// purpose: the only buffering beyond one logical event is backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Incremental SSE frame decoder.
///
/// Handles `data:` payload lines (including multi-line data joined with
/// `\n`), `:` comments, and the blank-line event terminator, buffering
/// partial lines across `feed` calls. `event:`, `id:` and `retry:` lines
/// are parsed and discarded: Dify carries the discriminator inside the
/// JSON payload, so the SSE metadata fields add nothing.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    /// Raw bytes not yet terminated by a newline. Kept as bytes so a
    /// multi-byte UTF-8 character split across two chunks is reassembled
    /// before any text conversion happens.
    line_buf: BytesMut,
    /// Payload of the event currently being assembled.
    data: String,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes, returning the payloads of all events
    /// completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.line_buf.extend_from_slice(chunk);
        let mut completed = Vec::new();
        while let Some(end) = self.line_buf.iter().position(|&b| b == b'\n') {
            let mut line = self.line_buf.split_to(end + 1);
            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            let line = String::from_utf8_lossy(&line);
            self.process_line(&line, &mut completed);
        }
        completed
    }

    /// Drains a trailing unterminated payload at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        self.line_buf.clear();
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data))
        }
    }

    fn process_line(&mut self, line: &str, completed: &mut Vec<String>) {
        if line.is_empty() {
            // Blank line: the authoritative event terminator.
            if !self.data.is_empty() {
                completed.push(std::mem::take(&mut self.data));
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest);
            // Latency optimization only: emit as soon as the payload reads
            // as one complete JSON value instead of waiting for the blank
            // line. Correctness never depends on this check.
            if looks_like_complete_json(&self.data) {
                completed.push(std::mem::take(&mut self.data));
            }
        } else if line.starts_with(':') {
            // Comment (keep-alive), ignored.
        } else {
            // event:/id:/retry: metadata, not surfaced.
        }
    }
}

/// Best-effort check that a payload is one complete JSON value.
///
/// Balanced-bracket scan for objects and arrays (string- and
/// escape-aware, and the closing bracket must end the payload), complete
/// quoted strings, the three keyword literals, or a numeric literal.
fn looks_like_complete_json(payload: &str) -> bool {
    let trimmed = payload.trim();
    let Some(first) = trimmed.bytes().next() else {
        return false;
    };
    match first {
        b'{' | b'[' => brackets_balanced(trimmed),
        b'"' => string_complete(trimmed),
        _ => {
            matches!(trimmed, "true" | "false" | "null") || trimmed.parse::<f64>().is_ok()
        }
    }
}

fn brackets_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    let last = text.len() - 1;
    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return i == last;
                }
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    false
}

fn string_complete(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut escaped = false;
    for (i, &byte) in bytes.iter().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            return i == bytes.len() - 1;
        }
    }
    false
}

pin_project! {
    /// Consumer handle for a streaming call.
    ///
    /// Yields events in frame order, then completes when the server
    /// closes the connection. Dropping it cancels the stream and closes
    /// the underlying HTTP connection.
    pub struct EventStream {
        rx: mpsc::Receiver<Result<StreamEvent>>,
        terminated: bool,
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.terminated {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(None) => {
                *this.terminated = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Spawns the decode loop for one streaming response and returns the
/// consumer handle.
pub(crate) fn spawn_event_stream(codec: JsonCodec, mut bytes: ByteStream) -> EventStream {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut decoder = SseFrameDecoder::new();
        loop {
            let chunk = tokio::select! {
                // Consumer dropped its handle while the stream was idle;
                // return now instead of waiting for the next chunk, so the
                // connection is released immediately.
                _ = tx.closed() => return,
                chunk = bytes.next() => chunk,
            };
            match chunk {
                Some(Ok(chunk)) => {
                    for payload in decoder.feed(&chunk) {
                        if !deliver(&codec, &tx, &payload).await {
                            // Consumer dropped its handle; returning drops
                            // `bytes` and closes the connection.
                            return;
                        }
                    }
                }
                Some(Err(err)) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
                None => break,
            }
        }
        if let Some(payload) = decoder.finish() {
            let _ = deliver(&codec, &tx, &payload).await;
        }
        // Dropping `tx` closes the channel: completion.
    });
    EventStream {
        rx,
        terminated: false,
    }
}

/// Decodes one payload and forwards it. Returns `false` once the consumer
/// is gone. An undecodable payload is a recoverable protocol glitch: it
/// is logged and skipped without touching the channel.
async fn deliver(
    codec: &JsonCodec,
    tx: &mpsc::Sender<Result<StreamEvent>>,
    payload: &str,
) -> bool {
    let decoded = codec
        .parse_tree(payload)
        .and_then(|tree| decode_stream_event(codec, &tree));
    match decoded {
        Ok(event) => tx.send(Ok(event)).await.is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, payload, "dropping undecodable stream event");
            true
        }
    }
}
