//! Response payloads for the Dify API.
//!
//! Streaming event shapes live in the `event` module; this module covers
//! the single-body (blocking) responses.

use crate::event::WorkflowFinishedData;
use crate::request::{Feedback, FileType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_with::{serde_as, EnumMap};
use std::collections::HashMap;

/// Generic `{"result": "success"}` acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: String,
}

/// Fields shared by message-producing responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBase {
    pub message_id: String,
    pub conversation_id: Option<String>,
    /// Unix timestamp, e.g. 1705395332.
    pub created_at: u64,
}

/// Blocking chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
    #[serde(flatten)]
    pub base: MessageBase,
    pub event: String,
    pub mode: AppMode,
    /// Complete answer text.
    pub answer: String,
    pub metadata: HashMap<String, JsonValue>,
}

/// Blocking completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessagesResponse {
    #[serde(flatten)]
    pub base: MessageBase,
    pub task_id: String,
    pub event: String,
    pub mode: AppMode,
    pub answer: String,
    pub metadata: HashMap<String, JsonValue>,
}

/// Blocking workflow run response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowsRunResponse {
    pub workflow_run_id: String,
    pub task_id: String,
    pub data: Option<WorkflowFinishedData>,
}

/// Dify application type.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum AppMode {
    Completion,
    Workflow,
    Chat,
    AdvancedChat,
    AgentChat,
    Channel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesSuggestedResponse {
    pub result: String,
    pub data: Vec<String>,
}

/// Conversation history page, newest first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesResponse {
    pub limit: u32,
    pub has_more: bool,
    pub data: Vec<MessageData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageData {
    pub id: String,
    pub conversation_id: String,
    pub inputs: JsonValue,
    pub query: String,
    pub answer: String,
    pub message_files: Vec<MessageFile>,
    pub feedback: Option<MessageFeedback>,
    /// Citation/attribution segments.
    pub retriever_resources: Vec<JsonValue>,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFile {
    pub id: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub url: String,
    pub belongs_to: BelongsTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelongsTo {
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageFeedback {
    pub rating: Feedback,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationsResponse {
    pub has_more: bool,
    pub limit: u32,
    pub data: Vec<ConversationData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationData {
    pub id: String,
    /// Defaults to a truncation of the user's first question.
    pub name: String,
    pub inputs: HashMap<String, String>,
    pub introduction: String,
    pub created_at: u64,
}

/// App configuration surfaced to end-user UIs.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParametersResponse {
    pub opening_statement: String,
    pub suggested_questions: Vec<String>,
    pub suggested_questions_after_answer: FeatureToggle,
    pub speech_to_text: FeatureToggle,
    pub retriever_resource: FeatureToggle,
    pub annotation_reply: FeatureToggle,
    pub user_input_form: Vec<UserInputFormItem>,
    #[serde_as(as = "EnumMap")]
    pub file_upload: Vec<FileUploadItem>,
    pub system_parameters: SystemParameters,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FeatureToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInputFormItem {
    #[serde(rename = "text-input")]
    TextInput {
        label: String,
        variable: String,
        required: bool,
    },
    Paragraph {
        label: String,
        variable: String,
        required: bool,
    },
    Number {
        label: String,
        variable: String,
        required: bool,
    },
    Select {
        label: String,
        variable: String,
        required: bool,
        options: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileUploadItem {
    Image {
        enabled: bool,
        /// Default 3.
        number_limits: u32,
        transfer_methods: Vec<TransferMethod>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    RemoteUrl,
    LocalFile,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemParameters {
    /// MB.
    pub image_file_size_limit: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaResponse {
    pub tool_icons: HashMap<String, ToolIcon>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolIcon {
    Url(String),
    Emoji { background: String, content: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioToTextResponse {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesUploadResponse {
    pub id: String,
    pub name: String,
    /// Bytes.
    pub size: u64,
    pub extension: String,
    pub mime_type: String,
    pub created_by: String,
    pub created_at: u64,
}

/// One dataset (knowledge base).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetData {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permission: Option<String>,
    pub document_count: Option<u32>,
    pub word_count: Option<u64>,
    pub created_by: Option<String>,
    pub created_at: Option<u64>,
}

/// Paged dataset listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetsResponse {
    pub data: Vec<DatasetData>,
    pub has_more: bool,
    pub limit: u32,
    pub total: u32,
    pub page: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentData {
    pub id: String,
    pub name: String,
    pub indexing_status: Option<String>,
    pub enabled: Option<bool>,
    pub word_count: Option<u64>,
    pub created_at: Option<u64>,
}

/// Response to creating a document; `batch` tracks indexing progress.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentCreateResponse {
    pub document: DocumentData,
    pub batch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentsResponse {
    pub data: Vec<DocumentData>,
    pub has_more: bool,
    pub limit: u32,
    pub total: u32,
    pub page: u32,
}

/// One document segment (chunk).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentData {
    pub id: String,
    pub position: Option<u32>,
    pub document_id: Option<String>,
    pub content: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub word_count: Option<u64>,
    pub tokens: Option<u64>,
    pub enabled: Option<bool>,
    pub status: Option<String>,
    pub created_at: Option<u64>,
}

/// Segment operations wrap their payload in a `data` array plus the
/// document form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentsResponse {
    pub data: Vec<SegmentData>,
    pub doc_form: Option<String>,
}
