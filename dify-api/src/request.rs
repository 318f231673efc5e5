//! Request payloads for the Dify API.

pub use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the server should deliver the response body.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Wait for completion and return a single JSON body.
    #[default]
    Blocking,
    /// Server-Sent Events; typewriter-style chunked output.
    Streaming,
}

/// File type accepted in message attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Image,
}

/// Attachment passed along with a chat/completion/workflow request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "transfer_method")]
pub enum MessageFileRef {
    /// The server fetches the file from a URL.
    RemoteUrl {
        #[serde(rename = "type")]
        file_type: FileType,
        url: String,
    },
    /// References a previously uploaded file.
    LocalFile {
        #[serde(rename = "type")]
        file_type: FileType,
        upload_file_id: String,
    },
}

/// Sends a conversation message.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatMessagesRequest {
    /// App-defined input variables.
    pub inputs: HashMap<String, String>,
    /// The user's question.
    pub query: String,
    pub response_mode: ResponseMode,
    /// End-user identifier, unique within the app.
    pub user: String,
    /// Pass the previous message's conversation id to continue a thread.
    pub conversation_id: String,
    pub files: Vec<MessageFileRef>,
    /// Auto-generate a conversation title (default true server-side).
    pub auto_generate_name: bool,
}

/// Text-generation (completion) request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompletionMessagesRequest {
    pub inputs: HashMap<String, String>,
    pub response_mode: ResponseMode,
    pub user: String,
    pub conversation_id: String,
    pub files: Vec<MessageFileRef>,
}

/// Runs a workflow app.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorkflowsRunRequest {
    pub inputs: HashMap<String, String>,
    pub response_mode: ResponseMode,
    pub user: String,
    pub files: Vec<MessageFileRef>,
}

/// Stops a streaming task. Streaming mode only.
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamTaskStopRequest {
    /// Task id taken from any streamed event.
    pub task_id: String,
    /// Must match the `user` of the originating request.
    pub user: String,
}

/// Fetches suggested follow-up questions for a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesSuggestedRequest {
    pub message_id: String,
}

/// End-user feedback on a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesFeedbacksRequest {
    pub message_id: String,
    /// `None` retracts a previous rating.
    pub rating: Option<Feedback>,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Like,
    Dislike,
}

/// Pages through conversation history, newest first.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MessagesRequest {
    pub conversation_id: String,
    pub user: String,
    /// Id of the first record on the current page.
    pub first_id: Option<String>,
    /// Page size, default 20 server-side.
    pub limit: Option<u32>,
}

/// Lists the user's conversations.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConversationsRequest {
    pub user: String,
    pub last_id: Option<String>,
    pub limit: Option<u32>,
    pub pinned: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ParametersRequest {
    pub user: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MetaRequest {
    pub user: String,
}

/// Renames a conversation.
#[derive(Default, Debug, Deserialize, Serialize)]
pub struct ConversationsRenameRequest {
    pub conversation_id: String,
    /// May be omitted when `auto_generate` is set.
    pub name: Option<String>,
    pub auto_generate: bool,
    pub user: String,
}

#[derive(Default, Debug, Deserialize, Serialize)]
pub struct ConversationsDeleteRequest {
    pub conversation_id: String,
    pub user: String,
}

/// Text-to-speech request.
#[derive(Default, Debug, Deserialize, Serialize)]
pub struct TextToAudioRequest {
    pub text: String,
    pub user: String,
    pub streaming: bool,
}

/// Speech-to-text request. Accepts mp3/mp4/mpeg/mpga/m4a/wav/webm up to
/// 15 MB.
#[derive(Default, Debug)]
pub struct AudioToTextRequest {
    pub file: Bytes,
    pub user: String,
}

/// Uploads a file (images only) for use in later messages.
#[derive(Default, Debug)]
pub struct FilesUploadRequest {
    pub file: Bytes,
    pub user: String,
}

/// Creates an empty dataset (knowledge base).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatasetCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `only_me` / `all_team_members`; server default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

/// Pages through datasets.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatasetsListRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Creates a document in a dataset from raw text.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentCreateByTextRequest {
    #[serde(skip)]
    pub dataset_id: String,
    pub name: String,
    pub text: String,
    /// `automatic` or `custom`.
    pub indexing_technique: String,
    pub process_rule: ProcessRule,
}

/// Document processing rule; `automatic` mode needs no further detail.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProcessRule {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<serde_json::Value>,
}

/// Pages through a dataset's documents.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentsListRequest {
    #[serde(skip)]
    pub dataset_id: String,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Appends segments (chunks) to a document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SegmentsAddRequest {
    #[serde(skip)]
    pub dataset_id: String,
    #[serde(skip)]
    pub document_id: String,
    pub segments: Vec<SegmentInput>,
}

/// One segment to add.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SegmentInput {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keywords: Vec<String>,
}

/// Lists a document's segments.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SegmentsListRequest {
    #[serde(skip)]
    pub dataset_id: String,
    #[serde(skip)]
    pub document_id: String,
    pub keyword: Option<String>,
    pub status: Option<String>,
}
