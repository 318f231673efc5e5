//! Typed endpoint surface of the Dify API.
//!
//! [`Api`] borrows a [`Client`] and exposes one method per endpoint. All
//! requests are described as transport-agnostic [`HttpRequest`] values;
//! blocking calls decode through the default status handler and the
//! client's [`JsonCodec`], streaming calls return an [`EventStream`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dify_api::{request::ChatMessagesRequest, Client};
//!
//! # async fn run() -> dify_api::Result<()> {
//! let client = Client::new("https://api.dify.ai", "API_KEY")?;
//! let response = client
//!     .api()
//!     .chat_messages(ChatMessagesRequest {
//!         query: "What is the weather today?".into(),
//!         user: "user123".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{check_status, HttpRequest, Method, Part};
use crate::request::{
    AudioToTextRequest, Bytes, ChatMessagesRequest, CompletionMessagesRequest,
    ConversationsDeleteRequest, ConversationsRenameRequest, ConversationsRequest,
    DatasetCreateRequest, DatasetsListRequest, DocumentCreateByTextRequest, DocumentsListRequest,
    FilesUploadRequest, MessagesFeedbacksRequest, MessagesRequest, MessagesSuggestedRequest,
    MetaRequest, ParametersRequest, ResponseMode, SegmentsAddRequest, SegmentsListRequest,
    StreamTaskStopRequest, TextToAudioRequest, WorkflowsRunRequest,
};
use crate::response::{
    AudioToTextResponse, ChatMessagesResponse, CompletionMessagesResponse, ConversationsResponse,
    DatasetData, DatasetsResponse, DocumentCreateResponse, DocumentsResponse, FilesUploadResponse,
    MessagesResponse, MessagesSuggestedResponse, MetaResponse, ParametersResponse, ResultResponse,
    SegmentsResponse, WorkflowsRunResponse,
};
use crate::sse::{spawn_event_stream, EventStream};
use futures::StreamExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// API paths, relative to the base URL. Path parameters use
/// `{placeholder}` substitution.
#[derive(Debug, Clone, Copy)]
pub enum ApiPath {
    ChatMessages,
    ChatMessagesStop,
    FilesUpload,
    MessagesFeedbacks,
    MessagesSuggested,
    Messages,
    Conversations,
    ConversationsDelete,
    ConversationsRename,
    AudioToText,
    TextToAudio,
    Parameters,
    Meta,
    WorkflowsRun,
    WorkflowsStop,
    CompletionMessages,
    CompletionMessagesStop,
    Datasets,
    DatasetsDelete,
    DocumentCreateByText,
    Documents,
    Segments,
}

impl ApiPath {
    /// # Example
    /// ```
    /// use dify_api::api::ApiPath;
    /// assert_eq!(ApiPath::ChatMessages.as_str(), "/v1/chat-messages");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiPath::ChatMessages => "/v1/chat-messages",
            ApiPath::ChatMessagesStop => "/v1/chat-messages/{task_id}/stop",
            ApiPath::FilesUpload => "/v1/files/upload",
            ApiPath::MessagesFeedbacks => "/v1/messages/{message_id}/feedbacks",
            ApiPath::MessagesSuggested => "/v1/messages/{message_id}/suggested",
            ApiPath::Messages => "/v1/messages",
            ApiPath::Conversations => "/v1/conversations",
            ApiPath::ConversationsDelete => "/v1/conversations/{conversation_id}",
            ApiPath::ConversationsRename => "/v1/conversations/{conversation_id}/name",
            ApiPath::AudioToText => "/v1/audio-to-text",
            ApiPath::TextToAudio => "/v1/text-to-audio",
            ApiPath::Parameters => "/v1/parameters",
            ApiPath::Meta => "/v1/meta",
            ApiPath::WorkflowsRun => "/v1/workflows/run",
            ApiPath::WorkflowsStop => "/v1/workflows/tasks/{task_id}/stop",
            ApiPath::CompletionMessages => "/v1/completion-messages",
            ApiPath::CompletionMessagesStop => "/v1/completion-messages/{task_id}/stop",
            ApiPath::Datasets => "/v1/datasets",
            ApiPath::DatasetsDelete => "/v1/datasets/{dataset_id}",
            ApiPath::DocumentCreateByText => "/v1/datasets/{dataset_id}/document/create-by-text",
            ApiPath::Documents => "/v1/datasets/{dataset_id}/documents",
            ApiPath::Segments => "/v1/datasets/{dataset_id}/documents/{document_id}/segments",
        }
    }
}

impl Display for ApiPath {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Hook invoked on every request before it is sent; may rewrite headers
/// (e.g. override the API key for one call).
type BeforeSend = Option<Box<dyn Fn(HttpRequest) -> HttpRequest + Send + Sync>>;

/// The Dify API bound to a client.
pub struct Api<'a> {
    before_send_hook: BeforeSend,
    pub(crate) client: &'a Client,
}

impl<'a> Api<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            before_send_hook: None,
            client,
        }
    }

    /// Registers a hook called with each request before sending.
    pub fn before_send<F>(&mut self, hook: F)
    where
        F: Fn(HttpRequest) -> HttpRequest + Send + Sync + 'static,
    {
        self.before_send_hook = Some(Box::new(hook));
    }

    fn url(&self, path: ApiPath) -> String {
        self.client.config.base_url.clone() + path.as_str()
    }

    fn json_request<T: Serialize>(
        &self,
        method: Method,
        url: String,
        data: &T,
    ) -> Result<HttpRequest> {
        let body = self.client.codec.to_json(data)?;
        Ok(HttpRequest::new(method, url)
            .bearer_auth(&self.client.config.api_key)
            .json(body))
    }

    fn query_request<T: Serialize>(
        &self,
        method: Method,
        url: String,
        data: &T,
    ) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(method, url).bearer_auth(&self.client.config.api_key);
        let tree = self.client.codec.value_to_tree(data)?;
        if let Value::Object(fields) = tree {
            for (name, value) in fields {
                match value {
                    Value::Null => {}
                    Value::String(text) => request = request.query(name, text),
                    other => request = request.query(name, other.to_string()),
                }
            }
        }
        Ok(request)
    }

    fn multipart_request(&self, url: String, parts: Vec<Part>) -> HttpRequest {
        HttpRequest::new(Method::Post, url)
            .bearer_auth(&self.client.config.api_key)
            .multipart(parts)
    }

    /// Sends a request and returns the body text after status checking.
    async fn send(&self, mut request: HttpRequest) -> Result<String> {
        if let Some(hook) = self.before_send_hook.as_ref() {
            request = hook(request);
        }
        let response = self.client.transport.execute(request).await?;
        check_status(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let text = self.send(request).await?;
        self.client.codec.from_json(&text)
    }

    /// Sends a streaming request. A non-2xx status before any event is
    /// collected into a typed error; otherwise the decode loop is spawned
    /// and its consumer handle returned immediately.
    async fn send_stream(&self, mut request: HttpRequest) -> Result<EventStream> {
        if let Some(hook) = self.before_send_hook.as_ref() {
            request = hook(request);
        }
        let response = self.client.transport.execute_stream(request).await?;
        if !response.is_successful() {
            let status = response.status;
            let mut body = response.body;
            let mut collected = Vec::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => collected.extend_from_slice(&bytes),
                    Err(_) => break,
                }
            }
            return Err(Error::from_status(
                status,
                &String::from_utf8_lossy(&collected),
            ));
        }
        Ok(spawn_event_stream(self.client.codec, response.body))
    }

    /// Sends a chat message and waits for the full answer.
    pub async fn chat_messages(
        &self,
        mut req_data: ChatMessagesRequest,
    ) -> Result<ChatMessagesResponse> {
        req_data.response_mode = ResponseMode::Blocking;
        let request = self.json_request(Method::Post, self.url(ApiPath::ChatMessages), &req_data)?;
        self.send_json(request).await
    }

    /// Sends a chat message and returns the event stream.
    pub async fn chat_messages_stream(
        &self,
        mut req_data: ChatMessagesRequest,
    ) -> Result<EventStream> {
        req_data.response_mode = ResponseMode::Streaming;
        let request = self.json_request(Method::Post, self.url(ApiPath::ChatMessages), &req_data)?;
        self.send_stream(request).await
    }

    /// Stops a streaming chat task.
    pub async fn chat_messages_stop(
        &self,
        req_data: StreamTaskStopRequest,
    ) -> Result<ResultResponse> {
        self.stream_task_stop(req_data, ApiPath::ChatMessagesStop)
            .await
    }

    /// Sends a completion request and waits for the full answer.
    pub async fn completion_messages(
        &self,
        mut req_data: CompletionMessagesRequest,
    ) -> Result<CompletionMessagesResponse> {
        req_data.response_mode = ResponseMode::Blocking;
        let request =
            self.json_request(Method::Post, self.url(ApiPath::CompletionMessages), &req_data)?;
        self.send_json(request).await
    }

    /// Sends a completion request and returns the event stream.
    pub async fn completion_messages_stream(
        &self,
        mut req_data: CompletionMessagesRequest,
    ) -> Result<EventStream> {
        req_data.response_mode = ResponseMode::Streaming;
        let request =
            self.json_request(Method::Post, self.url(ApiPath::CompletionMessages), &req_data)?;
        self.send_stream(request).await
    }

    /// Stops a streaming completion task.
    pub async fn completion_messages_stop(
        &self,
        req_data: StreamTaskStopRequest,
    ) -> Result<ResultResponse> {
        self.stream_task_stop(req_data, ApiPath::CompletionMessagesStop)
            .await
    }

    /// Runs a workflow and waits for the final state.
    pub async fn workflows_run(
        &self,
        mut req_data: WorkflowsRunRequest,
    ) -> Result<WorkflowsRunResponse> {
        req_data.response_mode = ResponseMode::Blocking;
        let request = self.json_request(Method::Post, self.url(ApiPath::WorkflowsRun), &req_data)?;
        self.send_json(request).await
    }

    /// Runs a workflow and returns the event stream.
    pub async fn workflows_run_stream(
        &self,
        mut req_data: WorkflowsRunRequest,
    ) -> Result<EventStream> {
        req_data.response_mode = ResponseMode::Streaming;
        let request = self.json_request(Method::Post, self.url(ApiPath::WorkflowsRun), &req_data)?;
        self.send_stream(request).await
    }

    /// Stops a streaming workflow task.
    pub async fn workflows_stop(&self, req_data: StreamTaskStopRequest) -> Result<ResultResponse> {
        self.stream_task_stop(req_data, ApiPath::WorkflowsStop)
            .await
    }

    async fn stream_task_stop(
        &self,
        mut req_data: StreamTaskStopRequest,
        path: ApiPath,
    ) -> Result<ResultResponse> {
        if req_data.task_id.is_empty() {
            return Err(Error::InvalidRequest("task_id must not be empty".into()));
        }
        let url = self.url(path).replace("{task_id}", &req_data.task_id);
        req_data.task_id = String::new();
        let request = self.json_request(Method::Post, url, &req_data)?;
        self.send_json(request).await
    }

    /// Uploads an image for use in later messages. The content type is
    /// sniffed from the bytes; non-image content is rejected client-side.
    pub async fn files_upload(&self, req_data: FilesUploadRequest) -> Result<FilesUploadResponse> {
        if !infer::is_image(&req_data.file) {
            return Err(Error::InvalidRequest("file is not an image".into()));
        }
        let kind = infer::get(&req_data.file)
            .ok_or_else(|| Error::InvalidRequest("unrecognized file content".into()))?;
        let parts = vec![
            Part::text("user", req_data.user),
            Part::bytes(
                "file",
                format!("image_file.{}", kind.extension()),
                kind.mime_type(),
                req_data.file,
            ),
        ];
        let request = self.multipart_request(self.url(ApiPath::FilesUpload), parts);
        self.send_json(request).await
    }

    /// Transcribes an audio file.
    pub async fn audio_to_text(&self, req_data: AudioToTextRequest) -> Result<AudioToTextResponse> {
        if !infer::is_audio(&req_data.file) {
            return Err(Error::InvalidRequest("file is not audio".into()));
        }
        let kind = infer::get(&req_data.file)
            .ok_or_else(|| Error::InvalidRequest("unrecognized file content".into()))?;
        let parts = vec![
            Part::text("user", req_data.user),
            Part::bytes(
                "file",
                format!("audio_file.{}", kind.extension()),
                kind.mime_type(),
                req_data.file,
            ),
        ];
        let request = self.multipart_request(self.url(ApiPath::AudioToText), parts);
        self.send_json(request).await
    }

    /// Synthesizes speech; returns the raw audio bytes.
    pub async fn text_to_audio(&self, req_data: TextToAudioRequest) -> Result<Bytes> {
        if req_data.text.is_empty() {
            return Err(Error::InvalidRequest("text must not be empty".into()));
        }
        let mut request =
            self.json_request(Method::Post, self.url(ApiPath::TextToAudio), &req_data)?;
        if let Some(hook) = self.before_send_hook.as_ref() {
            request = hook(request);
        }
        let response = self.client.transport.execute(request).await?;
        let audio = response
            .headers
            .get_first("content-type")
            .map(|ct| ct.starts_with("audio/"))
            .unwrap_or(false);
        if response.is_successful() && audio {
            return Ok(response.body);
        }
        // A non-audio body on this endpoint is an error payload even when
        // the status is 2xx.
        let status = response.status;
        let text = String::from_utf8_lossy(&response.body).into_owned();
        Err(Error::from_status(status, &text))
    }

    /// Fetches suggested follow-up questions for a message.
    pub async fn messages_suggested(
        &self,
        mut req_data: MessagesSuggestedRequest,
    ) -> Result<MessagesSuggestedResponse> {
        if req_data.message_id.is_empty() {
            return Err(Error::InvalidRequest("message_id must not be empty".into()));
        }
        let url = self
            .url(ApiPath::MessagesSuggested)
            .replace("{message_id}", &req_data.message_id);
        req_data.message_id = String::new();
        let request = self.query_request(Method::Get, url, &req_data)?;
        self.send_json(request).await
    }

    /// Submits end-user feedback on a message.
    pub async fn messages_feedbacks(
        &self,
        mut req_data: MessagesFeedbacksRequest,
    ) -> Result<ResultResponse> {
        if req_data.message_id.is_empty() {
            return Err(Error::InvalidRequest("message_id must not be empty".into()));
        }
        let url = self
            .url(ApiPath::MessagesFeedbacks)
            .replace("{message_id}", &req_data.message_id);
        req_data.message_id = String::new();
        let request = self.json_request(Method::Post, url, &req_data)?;
        self.send_json(request).await
    }

    /// Lists the user's conversations.
    pub async fn conversations(
        &self,
        req_data: ConversationsRequest,
    ) -> Result<ConversationsResponse> {
        if req_data.user.is_empty() {
            return Err(Error::InvalidRequest("user must not be empty".into()));
        }
        let request =
            self.query_request(Method::Get, self.url(ApiPath::Conversations), &req_data)?;
        self.send_json(request).await
    }

    /// Pages through a conversation's history, newest first.
    pub async fn messages(&self, req_data: MessagesRequest) -> Result<MessagesResponse> {
        if req_data.conversation_id.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation_id must not be empty".into(),
            ));
        }
        let request = self.query_request(Method::Get, self.url(ApiPath::Messages), &req_data)?;
        self.send_json(request).await
    }

    /// Renames a conversation.
    pub async fn conversations_rename(
        &self,
        mut req_data: ConversationsRenameRequest,
    ) -> Result<ResultResponse> {
        if req_data.conversation_id.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation_id must not be empty".into(),
            ));
        }
        if !req_data.auto_generate && req_data.name.is_none() {
            return Err(Error::InvalidRequest(
                "name is required unless auto_generate is set".into(),
            ));
        }
        let url = self
            .url(ApiPath::ConversationsRename)
            .replace("{conversation_id}", &req_data.conversation_id);
        req_data.conversation_id = String::new();
        let request = self.json_request(Method::Post, url, &req_data)?;
        self.send_json(request).await
    }

    /// Deletes a conversation. The server answers 204 on success.
    pub async fn conversations_delete(
        &self,
        mut req_data: ConversationsDeleteRequest,
    ) -> Result<()> {
        if req_data.conversation_id.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation_id must not be empty".into(),
            ));
        }
        let url = self
            .url(ApiPath::ConversationsDelete)
            .replace("{conversation_id}", &req_data.conversation_id);
        req_data.conversation_id = String::new();
        let request = self.json_request(Method::Delete, url, &req_data)?;
        self.send(request).await?;
        Ok(())
    }

    /// Fetches the app's input/feature configuration.
    pub async fn parameters(&self, req_data: ParametersRequest) -> Result<ParametersResponse> {
        if req_data.user.is_empty() {
            return Err(Error::InvalidRequest("user must not be empty".into()));
        }
        let request = self.query_request(Method::Get, self.url(ApiPath::Parameters), &req_data)?;
        self.send_json(request).await
    }

    /// Fetches app meta information (tool icons).
    pub async fn meta(&self, req_data: MetaRequest) -> Result<MetaResponse> {
        if req_data.user.is_empty() {
            return Err(Error::InvalidRequest("user must not be empty".into()));
        }
        let request = self.query_request(Method::Get, self.url(ApiPath::Meta), &req_data)?;
        self.send_json(request).await
    }

    /// Creates an empty dataset.
    pub async fn datasets_create(&self, req_data: DatasetCreateRequest) -> Result<DatasetData> {
        if req_data.name.is_empty() {
            return Err(Error::InvalidRequest("name must not be empty".into()));
        }
        let request = self.json_request(Method::Post, self.url(ApiPath::Datasets), &req_data)?;
        self.send_json(request).await
    }

    /// Pages through datasets.
    pub async fn datasets_list(&self, req_data: DatasetsListRequest) -> Result<DatasetsResponse> {
        let request = self.query_request(Method::Get, self.url(ApiPath::Datasets), &req_data)?;
        self.send_json(request).await
    }

    /// Deletes a dataset. The server answers 204 on success.
    pub async fn datasets_delete(&self, dataset_id: &str) -> Result<()> {
        if dataset_id.is_empty() {
            return Err(Error::InvalidRequest("dataset_id must not be empty".into()));
        }
        let url = self
            .url(ApiPath::DatasetsDelete)
            .replace("{dataset_id}", dataset_id);
        let request =
            HttpRequest::new(Method::Delete, url).bearer_auth(&self.client.config.api_key);
        self.send(request).await?;
        Ok(())
    }

    /// Creates a document in a dataset from raw text.
    pub async fn documents_create_by_text(
        &self,
        req_data: DocumentCreateByTextRequest,
    ) -> Result<DocumentCreateResponse> {
        if req_data.dataset_id.is_empty() {
            return Err(Error::InvalidRequest("dataset_id must not be empty".into()));
        }
        let url = self
            .url(ApiPath::DocumentCreateByText)
            .replace("{dataset_id}", &req_data.dataset_id);
        let request = self.json_request(Method::Post, url, &req_data)?;
        self.send_json(request).await
    }

    /// Pages through a dataset's documents.
    pub async fn documents_list(
        &self,
        req_data: DocumentsListRequest,
    ) -> Result<DocumentsResponse> {
        if req_data.dataset_id.is_empty() {
            return Err(Error::InvalidRequest("dataset_id must not be empty".into()));
        }
        let url = self
            .url(ApiPath::Documents)
            .replace("{dataset_id}", &req_data.dataset_id);
        let request = self.query_request(Method::Get, url, &req_data)?;
        self.send_json(request).await
    }

    /// Appends segments to a document.
    pub async fn segments_add(&self, req_data: SegmentsAddRequest) -> Result<SegmentsResponse> {
        if req_data.dataset_id.is_empty() || req_data.document_id.is_empty() {
            return Err(Error::InvalidRequest(
                "dataset_id and document_id must not be empty".into(),
            ));
        }
        let url = self
            .url(ApiPath::Segments)
            .replace("{dataset_id}", &req_data.dataset_id)
            .replace("{document_id}", &req_data.document_id);
        let request = self.json_request(Method::Post, url, &req_data)?;
        self.send_json(request).await
    }

    /// Lists a document's segments.
    pub async fn segments_list(&self, req_data: SegmentsListRequest) -> Result<SegmentsResponse> {
        if req_data.dataset_id.is_empty() || req_data.document_id.is_empty() {
            return Err(Error::InvalidRequest(
                "dataset_id and document_id must not be empty".into(),
            ));
        }
        let url = self
            .url(ApiPath::Segments)
            .replace("{dataset_id}", &req_data.dataset_id)
            .replace("{document_id}", &req_data.document_id);
        let request = self.query_request(Method::Get, url, &req_data)?;
        self.send_json(request).await
    }
}
