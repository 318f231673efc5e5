//! Discriminated streaming events.
//!
//! Each SSE record carries a JSON object whose `event` field selects the
//! payload shape. Decoding goes through an explicit registry mapping
//! discriminator strings to decoder functions; a missing or unrecognized
//! discriminator degrades to [`EventPayload::Unknown`] so that new
//! server-side event types never break the client.

use crate::codec::JsonCodec;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One decoded streaming event.
///
/// The envelope fields are orthogonal to the payload variant: they are
/// populated from the root object whenever present, no matter which
/// discriminator matched.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub task_id: Option<String>,
    pub workflow_run_id: Option<String>,
    pub message_id: Option<String>,
    pub conversation_id: Option<String>,
    pub created_at: Option<u64>,
    pub payload: EventPayload,
}

/// Payload variants keyed by the `event` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// `message`: one text chunk of the answer.
    Message(MessageChunk),
    /// `agent_message`: text chunk emitted in agent mode.
    AgentMessage(MessageChunk),
    /// `agent_thought`: an agent reasoning step with tool-call metadata.
    AgentThought(AgentThought),
    /// `message_file`: a file produced during the conversation.
    MessageFile(MessageFileInfo),
    /// `message_end`: terminal event of a chat stream.
    MessageEnd(MessageEnd),
    /// `message_replace`: moderation replaced the full answer text.
    MessageReplace(MessageReplace),
    /// `workflow_started`
    WorkflowStarted(Option<WorkflowStartedData>),
    /// `workflow_finished`
    WorkflowFinished(Option<WorkflowFinishedData>),
    /// `node_started`
    NodeStarted(Option<NodeStartedData>),
    /// `node_finished`
    NodeFinished(Option<NodeFinishedData>),
    /// `text_chunk`: raw text fragment from a workflow node.
    TextChunk(Option<TextChunkData>),
    /// `agent_log`: agent-mode node log entry; kept as a raw tree.
    AgentLog(Option<Value>),
    /// `error`: in-band stream failure reported by the server.
    Error(StreamErrorInfo),
    /// `ping`: keep-alive, sent every 10s.
    Ping,
    /// Discriminator absent or not registered; the raw tree is preserved.
    Unknown { event: Option<String>, raw: Value },
}

/// A chunked answer fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageChunk {
    pub id: Option<String>,
    pub answer: String,
}

/// Agent reasoning step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentThought {
    pub id: Option<String>,
    /// Position of this thought within the message, starting at 1.
    pub position: Option<u32>,
    pub thought: Option<String>,
    /// Tool output observed by the agent.
    pub observation: Option<String>,
    /// Tool names, `;`-separated when several were invoked.
    pub tool: Option<String>,
    pub tool_labels: Option<Value>,
    /// Tool input as a JSON-formatted string.
    pub tool_input: Option<String>,
    pub message_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFileInfo {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub belongs_to: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEnd {
    pub id: Option<String>,
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageReplace {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamErrorInfo {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Run state shared by workflow and node events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowStartedData {
    pub id: String,
    pub workflow_id: String,
    /// App-scoped run counter, starting at 1.
    pub sequence_number: Option<u32>,
    pub inputs: Option<Value>,
    pub created_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowFinishedData {
    pub id: String,
    pub workflow_id: String,
    pub status: Option<RunStatus>,
    pub outputs: Option<Value>,
    pub error: Option<String>,
    /// Seconds.
    pub elapsed_time: Option<f64>,
    pub total_tokens: Option<u64>,
    pub total_steps: Option<u32>,
    pub created_at: Option<u64>,
    pub finished_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStartedData {
    pub id: String,
    pub node_id: String,
    pub node_type: Option<String>,
    pub title: Option<String>,
    /// Execution order, used to display node tracing.
    pub index: Option<u32>,
    pub predecessor_node_id: Option<String>,
    pub inputs: Option<Value>,
    pub created_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFinishedData {
    pub id: String,
    pub node_id: String,
    pub index: Option<u32>,
    pub predecessor_node_id: Option<String>,
    pub inputs: Option<Value>,
    pub process_data: Option<Value>,
    pub outputs: Option<Value>,
    pub status: Option<RunStatus>,
    pub error: Option<String>,
    pub elapsed_time: Option<f64>,
    pub execution_metadata: Option<ExecutionMetadata>,
    pub created_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionMetadata {
    pub total_tokens: Option<u64>,
    pub total_price: Option<String>,
    /// e.g. `USD`.
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextChunkData {
    pub text: String,
    pub from_variable_selector: Option<Value>,
}

type PayloadDecoder = fn(&JsonCodec, &Value) -> Result<EventPayload>;

/// Discriminator registry, resolved at composition time. Order matters
/// only for readability; lookup is by exact string match.
const REGISTRY: &[(&str, PayloadDecoder)] = &[
    ("message", |c, root| {
        Ok(EventPayload::Message(decode_root(c, root)?))
    }),
    ("agent_message", |c, root| {
        Ok(EventPayload::AgentMessage(decode_root(c, root)?))
    }),
    ("agent_thought", |c, root| {
        Ok(EventPayload::AgentThought(decode_root(c, root)?))
    }),
    ("message_file", |c, root| {
        Ok(EventPayload::MessageFile(decode_root(c, root)?))
    }),
    ("message_end", |c, root| {
        Ok(EventPayload::MessageEnd(decode_root(c, root)?))
    }),
    ("message_replace", |c, root| {
        Ok(EventPayload::MessageReplace(decode_root(c, root)?))
    }),
    ("workflow_started", |c, root| {
        Ok(EventPayload::WorkflowStarted(decode_data(c, root)?))
    }),
    ("workflow_finished", |c, root| {
        Ok(EventPayload::WorkflowFinished(decode_data(c, root)?))
    }),
    ("node_started", |c, root| {
        Ok(EventPayload::NodeStarted(decode_data(c, root)?))
    }),
    ("node_finished", |c, root| {
        Ok(EventPayload::NodeFinished(decode_data(c, root)?))
    }),
    ("text_chunk", |c, root| {
        Ok(EventPayload::TextChunk(decode_data(c, root)?))
    }),
    ("agent_log", |_, root| {
        Ok(EventPayload::AgentLog(
            root.get("data").filter(|d| !d.is_null()).cloned(),
        ))
    }),
    ("error", |c, root| {
        Ok(EventPayload::Error(decode_root(c, root)?))
    }),
    ("ping", |_, _| Ok(EventPayload::Ping)),
];

/// Decodes one event tree into a [`StreamEvent`].
///
/// Never fails on an unknown or missing discriminator; only a payload
/// whose fields are present but of the wrong shape produces an error
/// (which the stream reader logs and drops).
pub fn decode_stream_event(codec: &JsonCodec, root: &Value) -> Result<StreamEvent> {
    let discriminator = root.get("event").and_then(Value::as_str);
    let payload = match discriminator {
        Some(name) => match REGISTRY.iter().find(|(key, _)| *key == name) {
            Some((_, decoder)) => decoder(codec, root)?,
            None => {
                tracing::debug!(event = name, "unrecognized stream event");
                EventPayload::Unknown {
                    event: Some(name.to_owned()),
                    raw: root.clone(),
                }
            }
        },
        None => {
            tracing::debug!("stream event without discriminator");
            EventPayload::Unknown {
                event: None,
                raw: root.clone(),
            }
        }
    };

    Ok(StreamEvent {
        task_id: string_field(root, "task_id"),
        workflow_run_id: string_field(root, "workflow_run_id"),
        message_id: string_field(root, "message_id"),
        conversation_id: string_field(root, "conversation_id"),
        created_at: root.get("created_at").and_then(Value::as_u64),
        payload,
    })
}

/// Maps the whole root object to a payload struct; absent fields fall
/// back to their defaults.
fn decode_root<T: serde::de::DeserializeOwned + Default>(
    codec: &JsonCodec,
    root: &Value,
) -> Result<T> {
    Ok(codec.tree_to_value(root)?.unwrap_or_default())
}

/// Maps the nested `data` node to a payload struct; a missing or `null`
/// node yields `None`.
fn decode_data<T: serde::de::DeserializeOwned>(
    codec: &JsonCodec,
    root: &Value,
) -> Result<Option<T>> {
    match root.get("data") {
        Some(node) => codec.tree_to_value(node),
        None => Ok(None),
    }
}

fn string_field(root: &Value, key: &str) -> Option<String> {
    root.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(root: Value) -> StreamEvent {
        decode_stream_event(&JsonCodec::new(), &root).unwrap()
    }

    #[test]
    fn message_event_decodes_answer_and_envelope() {
        let event = decode(json!({
            "event": "message",
            "task_id": "t-1",
            "message_id": "m-1",
            "conversation_id": "c-1",
            "created_at": 1705395332u64,
            "id": "m-1",
            "answer": "Hello",
        }));
        assert_eq!(event.task_id.as_deref(), Some("t-1"));
        assert_eq!(event.message_id.as_deref(), Some("m-1"));
        assert_eq!(event.conversation_id.as_deref(), Some("c-1"));
        assert_eq!(event.created_at, Some(1705395332));
        match event.payload {
            EventPayload::Message(chunk) => assert_eq!(chunk.answer, "Hello"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn workflow_started_decodes_data_node() {
        let event = decode(json!({
            "event": "workflow_started",
            "task_id": "t-2",
            "workflow_run_id": "run-1",
            "data": {
                "id": "run-1",
                "workflow_id": "wf-1",
                "sequence_number": 7,
                "inputs": {"q": "hi"},
                "created_at": 1705395400u64,
            },
        }));
        assert_eq!(event.workflow_run_id.as_deref(), Some("run-1"));
        match event.payload {
            EventPayload::WorkflowStarted(Some(data)) => {
                assert_eq!(data.id, "run-1");
                assert_eq!(data.workflow_id, "wf-1");
                assert_eq!(data.sequence_number, Some(7));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn node_finished_status_and_metadata() {
        let event = decode(json!({
            "event": "node_finished",
            "task_id": "t-3",
            "workflow_run_id": "run-1",
            "data": {
                "id": "exec-1",
                "node_id": "node-1",
                "index": 2,
                "status": "succeeded",
                "elapsed_time": 0.42,
                "execution_metadata": {
                    "total_tokens": 128,
                    "total_price": "0.0001",
                    "currency": "USD",
                },
            },
        }));
        match event.payload {
            EventPayload::NodeFinished(Some(data)) => {
                assert_eq!(data.status, Some(RunStatus::Succeeded));
                assert_eq!(
                    data.execution_metadata.unwrap().total_tokens,
                    Some(128)
                );
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn missing_data_node_is_none() {
        let event = decode(json!({"event": "workflow_finished", "task_id": "t"}));
        assert!(matches!(
            event.payload,
            EventPayload::WorkflowFinished(None)
        ));
    }

    #[test]
    fn null_data_node_is_none() {
        let event = decode(json!({"event": "node_started", "data": null}));
        assert!(matches!(event.payload, EventPayload::NodeStarted(None)));
    }

    #[test]
    fn unknown_discriminator_degrades_to_unknown() {
        let raw = json!({"event": "loop_iteration", "task_id": "t-9", "data": {"x": 1}});
        let event = decode(raw.clone());
        // Envelope fields still populate for unknown events.
        assert_eq!(event.task_id.as_deref(), Some("t-9"));
        match event.payload {
            EventPayload::Unknown { event, raw: kept } => {
                assert_eq!(event.as_deref(), Some("loop_iteration"));
                assert_eq!(kept, raw);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn missing_discriminator_degrades_to_unknown() {
        let event = decode(json!({"answer": "stray"}));
        assert!(matches!(
            event.payload,
            EventPayload::Unknown { event: None, .. }
        ));
    }

    #[test]
    fn non_string_discriminator_degrades_to_unknown() {
        let event = decode(json!({"event": 42}));
        assert!(matches!(
            event.payload,
            EventPayload::Unknown { event: None, .. }
        ));
    }

    #[test]
    fn agent_thought_tool_metadata() {
        let event = decode(json!({
            "event": "agent_thought",
            "id": "th-1",
            "task_id": "t-4",
            "position": 1,
            "thought": "search first",
            "observation": "{\"result\": []}",
            "tool": "web_search;calculator",
            "tool_input": "{\"query\":\"rust\"}",
            "message_files": ["f-1"],
        }));
        match event.payload {
            EventPayload::AgentThought(thought) => {
                assert_eq!(thought.position, Some(1));
                assert_eq!(thought.tool.as_deref(), Some("web_search;calculator"));
                assert_eq!(thought.message_files, vec!["f-1".to_owned()]);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn error_event_is_payload_not_failure() {
        let event = decode(json!({
            "event": "error",
            "task_id": "t-5",
            "status": 400,
            "code": "invalid_param",
            "message": "bad input",
        }));
        match event.payload {
            EventPayload::Error(info) => {
                assert_eq!(info.status, Some(400));
                assert_eq!(info.code.as_deref(), Some("invalid_param"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn ping_has_no_fields() {
        let event = decode(json!({"event": "ping"}));
        assert_eq!(event.payload, EventPayload::Ping);
    }
}
