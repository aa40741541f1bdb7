use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WidgetRoot;

/// Sentinel id the agent runtime puts on items it streams before storage
/// has assigned a real one.
pub const FAKE_ITEM_ID: &str = "__fake_id__";

/// Returns true when `id` is a placeholder that must be replaced before the
/// item reaches storage or the client.
pub fn is_placeholder_id(id: &str) -> bool {
    id.is_empty() || id == FAKE_ITEM_ID || id == "N/A"
}

/// Kind of a thread item, used where only the variant matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    UserMessage,
    AssistantMessage,
    ToolCall,
    Widget,
}

/// A text part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

impl TextContent {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

fn join_text(content: &[TextContent]) -> String {
    content
        .iter()
        .map(|part| part.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub content: Vec<TextContent>,
}

impl UserMessageItem {
    pub fn text(&self) -> String {
        join_text(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessageItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub content: Vec<TextContent>,
}

impl AssistantMessageItem {
    pub fn text(&self) -> String {
        join_text(&self.content)
    }
}

/// Status of a recorded tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// Waiting for a client to supply the output.
    Pending,
    Completed,
    /// A human rejected the call; the tool never ran.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    /// Correlation id minted by the tool-call mechanism.
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub widget: WidgetRoot,
    /// Plain-text fallback for clients that cannot render widgets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_text: Option<String>,
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItem {
    UserMessage(UserMessageItem),
    AssistantMessage(AssistantMessageItem),
    ToolCall(ToolCallItem),
    Widget(WidgetItem),
}

impl ThreadItem {
    pub fn user_message(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        ThreadItem::UserMessage(UserMessageItem {
            id: id.into(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            content: vec![TextContent::new(text)],
        })
    }

    pub fn assistant_message(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        ThreadItem::AssistantMessage(AssistantMessageItem {
            id: id.into(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            content: vec![TextContent::new(text)],
        })
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ThreadItem::UserMessage(_) => ItemKind::UserMessage,
            ThreadItem::AssistantMessage(_) => ItemKind::AssistantMessage,
            ThreadItem::ToolCall(_) => ItemKind::ToolCall,
            ThreadItem::Widget(_) => ItemKind::Widget,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ThreadItem::UserMessage(item) => &item.id,
            ThreadItem::AssistantMessage(item) => &item.id,
            ThreadItem::ToolCall(item) => &item.id,
            ThreadItem::Widget(item) => &item.id,
        }
    }

    pub fn set_id<S: Into<String>>(&mut self, id: S) {
        let id = id.into();
        match self {
            ThreadItem::UserMessage(item) => item.id = id,
            ThreadItem::AssistantMessage(item) => item.id = id,
            ThreadItem::ToolCall(item) => item.id = id,
            ThreadItem::Widget(item) => item.id = id,
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            ThreadItem::UserMessage(item) => &item.thread_id,
            ThreadItem::AssistantMessage(item) => &item.thread_id,
            ThreadItem::ToolCall(item) => &item.thread_id,
            ThreadItem::Widget(item) => &item.thread_id,
        }
    }

    pub fn has_placeholder_id(&self) -> bool {
        is_placeholder_id(self.id())
    }
}
