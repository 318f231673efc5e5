//! End-to-end tests of the request/stream pipeline over a scripted
//! transport, so no network access is needed.

use async_trait::async_trait;
use bytes::Bytes;
use dify_api::error::{Error, Result};
use dify_api::event::EventPayload;
use dify_api::http::{ByteStream, Headers, HttpRequest, HttpResponse, HttpTransport};
use dify_api::request::{ChatMessagesRequest, StreamTaskStopRequest, WorkflowsRunRequest};
use dify_api::{Client, Config};
use futures::StreamExt;
use std::sync::{Arc, Mutex};

/// Transport that replays a scripted response and records requests.
struct ScriptedTransport {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    /// Chunks handed out by `execute_stream`; `execute` concatenates the
    /// `Ok` chunks into one body.
    chunks: Mutex<Vec<Result<Bytes>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(status: u16, chunks: Vec<Result<Bytes>>) -> Arc<Self> {
        Arc::new(Self {
            status,
            headers: vec![("Content-Type", "text/event-stream")],
            chunks: Mutex::new(chunks),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn body(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            headers: vec![("Content-Type", "application/json")],
            chunks: Mutex::new(vec![Ok(Bytes::from(body.to_owned()))]),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn response_headers(&self) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in &self.headers {
            headers.append(*name, *value);
        }
        headers
    }

    fn last_request(&self) -> HttpRequest {
        self.seen.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse<Bytes>> {
        self.seen.lock().unwrap().push(request);
        let mut body = Vec::new();
        for chunk in self.chunks.lock().unwrap().drain(..) {
            match chunk {
                Ok(bytes) => body.extend_from_slice(&bytes),
                Err(err) => return Err(err),
            }
        }
        Ok(HttpResponse {
            status: self.status,
            headers: self.response_headers(),
            body: Bytes::from(body),
        })
    }

    async fn execute_stream(&self, request: HttpRequest) -> Result<HttpResponse<ByteStream>> {
        self.seen.lock().unwrap().push(request);
        let chunks: Vec<Result<Bytes>> = self.chunks.lock().unwrap().drain(..).collect();
        let body: ByteStream = Box::pin(futures::stream::iter(chunks));
        Ok(HttpResponse {
            status: self.status,
            headers: self.response_headers(),
            body,
        })
    }
}

fn client_with(transport: Arc<ScriptedTransport>) -> Client {
    let config = Config {
        base_url: "https://dify.test".into(),
        api_key: "test-key".into(),
        ..Config::default()
    };
    Client::with_transport(config, transport)
}

fn chat_request() -> ChatMessagesRequest {
    ChatMessagesRequest {
        query: "hello".into(),
        user: "tester".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn single_event_then_completion() {
    let transport = ScriptedTransport::new(
        200,
        vec![Ok(Bytes::from_static(
            b"data: {\"event\":\"message\",\"task_id\":\"t-1\",\"answer\":\"hi\"}\n\n",
        ))],
    );
    let client = client_with(transport);
    let mut stream = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    assert_eq!(event.task_id.as_deref(), Some("t-1"));
    match event.payload {
        EventPayload::Message(chunk) => assert_eq!(chunk.answer, "hi"),
        other => panic!("unexpected payload: {other:?}"),
    }
    assert!(stream.next().await.is_none(), "stream should complete");
}

#[tokio::test]
async fn malformed_event_is_dropped_without_error() {
    let transport = ScriptedTransport::new(
        200,
        vec![Ok(Bytes::from_static(
            b"data: {bad}\n\ndata: {\"event\":\"message\",\"answer\":\"ok\"}\n\n",
        ))],
    );
    let client = client_with(transport);
    let mut stream = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    match event.payload {
        EventPayload::Message(chunk) => assert_eq!(chunk.answer, "ok"),
        other => panic!("unexpected payload: {other:?}"),
    }
    assert!(stream.next().await.is_none(), "no error item expected");
}

#[tokio::test]
async fn event_split_across_chunks() {
    let transport = ScriptedTransport::new(
        200,
        vec![
            Ok(Bytes::from_static(b"data: {\"event\":\"mes")),
            Ok(Bytes::from_static(b"sage\",\"answer\":\"joined\"}")),
            Ok(Bytes::from_static(b"\n\n")),
        ],
    );
    let client = client_with(transport);
    let mut stream = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    match event.payload {
        EventPayload::Message(chunk) => assert_eq!(chunk.answer, "joined"),
        other => panic!("unexpected payload: {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn payload_without_discriminator_degrades_to_unknown() {
    let transport =
        ScriptedTransport::new(200, vec![Ok(Bytes::from_static(b"data: {\"a\":1}\n\n"))]);
    let client = client_with(transport);
    let mut stream = client
        .api()
        .workflows_run_stream(WorkflowsRunRequest {
            user: "tester".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    match event.payload {
        EventPayload::Unknown { event: None, raw } => assert_eq!(raw["a"], 1),
        other => panic!("unexpected payload: {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn transport_error_mid_stream_surfaces_after_prior_events() {
    let transport = ScriptedTransport::new(
        200,
        vec![
            Ok(Bytes::from_static(
                b"data: {\"event\":\"message\",\"answer\":\"first\"}\n\n",
            )),
            Err(Error::Transport("connection reset".into())),
        ],
    );
    let client = client_with(transport);
    let mut stream = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().is_ok());
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn streaming_401_yields_unauthorized() {
    let transport = ScriptedTransport::new(
        401,
        vec![Ok(Bytes::from_static(
            br#"{"code":"unauthorized","message":"invalid api key","status":401}"#,
        ))],
    );
    let client = client_with(transport);
    let err = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn blocking_404_yields_not_found() {
    let transport = ScriptedTransport::body(
        404,
        r#"{"code":"not_found","message":"conversation missing","status":404}"#,
    );
    let client = client_with(transport);
    let err = client.api().chat_messages(chat_request()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn blocking_200_decodes_body() {
    let transport = ScriptedTransport::body(
        200,
        r#"{
            "message_id": "m-1",
            "conversation_id": "c-1",
            "created_at": 1705395332,
            "event": "message",
            "mode": "chat",
            "answer": "Hello!",
            "metadata": {}
        }"#,
    );
    let client = client_with(transport.clone());
    let response = client.api().chat_messages(chat_request()).await.unwrap();
    assert_eq!(response.answer, "Hello!");
    assert_eq!(response.base.message_id, "m-1");

    let request = transport.last_request();
    assert_eq!(
        request.headers.get_first("authorization"),
        Some("Bearer test-key")
    );
    assert!(request.url.ends_with("/v1/chat-messages"));
}

#[tokio::test]
async fn before_send_hook_can_override_api_key() {
    let transport = ScriptedTransport::body(200, r#"{"result":"success"}"#);
    let client = client_with(transport.clone());
    let mut api = client.api();
    api.before_send(|req| req.bearer_auth("override-key"));
    api.chat_messages_stop(StreamTaskStopRequest {
        task_id: "t-1".into(),
        user: "tester".into(),
    })
    .await
    .unwrap();

    let request = transport.last_request();
    assert_eq!(
        request.headers.get_or_empty("authorization"),
        vec!["Bearer override-key"]
    );
    assert!(request.url.ends_with("/v1/chat-messages/t-1/stop"));
}

#[tokio::test]
async fn empty_task_id_rejected_client_side() {
    let transport = ScriptedTransport::body(200, r#"{"result":"success"}"#);
    let client = client_with(transport.clone());
    let err = client
        .api()
        .workflows_stop(StreamTaskStopRequest {
            task_id: String::new(),
            user: "tester".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(transport.seen.lock().unwrap().is_empty(), "nothing sent");
}

#[tokio::test]
async fn dropping_stream_stops_the_decode_loop() {
    let transport = ScriptedTransport::new(
        200,
        vec![Ok(Bytes::from_static(
            b"data: {\"event\":\"message\",\"answer\":\"first\"}\n\n\
              data: {\"event\":\"message\",\"answer\":\"second\"}\n\n",
        ))],
    );
    let client = client_with(transport);
    let mut stream = client
        .api()
        .chat_messages_stream(chat_request())
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    // Dropping the handle closes the channel; the spawned task observes
    // the closed channel on its next send and exits.
    drop(stream);
    tokio::task::yield_now().await;
}
