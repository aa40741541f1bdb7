use serde::{Deserialize, Serialize};

use super::ThreadItem;

/// Live transcript event produced while a turn runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadStreamEvent {
    /// An item started. Its content may still grow through deltas.
    #[serde(rename = "thread.item.added")]
    ItemAdded { item: ThreadItem },
    /// An item is final. This is the terminal event for that item.
    #[serde(rename = "thread.item.done")]
    ItemDone { item: ThreadItem },
    /// Incremental text for an item that was added earlier.
    #[serde(rename = "thread.item.updated")]
    ItemDelta { item_id: String, delta: String },
}

impl ThreadStreamEvent {
    pub fn added(item: ThreadItem) -> Self {
        ThreadStreamEvent::ItemAdded { item }
    }

    pub fn done(item: ThreadItem) -> Self {
        ThreadStreamEvent::ItemDone { item }
    }

    pub fn delta<S: Into<String>>(item_id: S, delta: S) -> Self {
        ThreadStreamEvent::ItemDelta {
            item_id: item_id.into(),
            delta: delta.into(),
        }
    }

    /// Id of the item this event refers to.
    pub fn item_id(&self) -> &str {
        match self {
            ThreadStreamEvent::ItemAdded { item } | ThreadStreamEvent::ItemDone { item } => {
                item.id()
            }
            ThreadStreamEvent::ItemDelta { item_id, .. } => item_id,
        }
    }

    pub fn item(&self) -> Option<&ThreadItem> {
        match self {
            ThreadStreamEvent::ItemAdded { item } | ThreadStreamEvent::ItemDone { item } => {
                Some(item)
            }
            ThreadStreamEvent::ItemDelta { .. } => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ThreadStreamEvent::ItemDone { .. })
    }

    /// Renders the event as one server-sent-events frame.
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}
