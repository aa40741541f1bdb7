use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::persistence::TranscriptStore;
use crate::schemas::{ThreadItem, ThreadStreamEvent, WidgetItem, WidgetRoot, FAKE_ITEM_ID};

use super::{StreamWriter, ToolContext, ToolError};

/// Tool call the client must fulfil after the run stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientToolCall {
    pub name: String,
    pub arguments: Value,
}

/// Runtime information available to tools during execution.
///
/// Everything here is request-scoped and built fresh for each execution
/// pass, including a pass that resumes a persisted run. None of it is
/// reachable from the run state.
#[derive(Clone)]
pub struct ToolRuntime {
    /// Immutable context (principal, conversation, custom values)
    pub context: Arc<dyn ToolContext>,
    /// Transcript of the conversation the tool runs in
    pub transcript: Option<Arc<dyn TranscriptStore>>,
    /// Live event stream of the current pass
    pub stream_writer: Option<Arc<dyn StreamWriter>>,
    /// Current tool call ID
    pub tool_call_id: String,
    /// Conversation the items streamed by the tool belong to
    pub thread_id: String,
    client_tool_call: Arc<Mutex<Option<ClientToolCall>>>,
}

impl ToolRuntime {
    pub fn new(context: Arc<dyn ToolContext>, thread_id: String, tool_call_id: String) -> Self {
        Self {
            context,
            transcript: None,
            stream_writer: None,
            tool_call_id,
            thread_id,
            client_tool_call: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptStore>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn with_stream_writer(mut self, writer: Arc<dyn StreamWriter>) -> Self {
        self.stream_writer = Some(writer);
        self
    }

    pub fn context(&self) -> &dyn ToolContext {
        self.context.as_ref()
    }

    pub fn transcript(&self) -> Result<&Arc<dyn TranscriptStore>, ToolError> {
        self.transcript
            .as_ref()
            .ok_or_else(|| ToolError::MissingCollaborator("transcript store".to_string()))
    }

    pub fn stream_writer(&self) -> Result<&Arc<dyn StreamWriter>, ToolError> {
        self.stream_writer
            .as_ref()
            .ok_or_else(|| ToolError::MissingCollaborator("stream writer".to_string()))
    }

    /// Streams a widget item into the live transcript.
    pub async fn stream_widget(
        &self,
        widget: WidgetRoot,
        copy_text: Option<String>,
    ) -> Result<(), ToolError> {
        let writer = self.stream_writer()?;
        let item = ThreadItem::Widget(WidgetItem {
            id: FAKE_ITEM_ID.to_string(),
            thread_id: self.thread_id.clone(),
            created_at: Utc::now(),
            widget,
            copy_text,
        });
        writer.write(ThreadStreamEvent::added(item.clone())).await?;
        writer.write(ThreadStreamEvent::done(item)).await
    }

    /// Records a call the client has to complete; the run stops after this tool.
    pub async fn set_client_tool_call(&self, call: ClientToolCall) {
        *self.client_tool_call.lock().await = Some(call);
    }

    pub async fn take_client_tool_call(&self) -> Option<ClientToolCall> {
        self.client_tool_call.lock().await.take()
    }
}
