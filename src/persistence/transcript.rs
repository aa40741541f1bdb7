use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::schemas::{is_placeholder_id, ThreadItem};

use super::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
    /// Cursor for the next page
    pub after: Option<String>,
}

/// Storage API for conversation transcripts.
///
/// Item ids are primary keys; callers only pass items whose ids have
/// been normalized.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, conversation_id: &str, item: ThreadItem)
        -> Result<(), PersistenceError>;

    /// Lists items after the `after` cursor (an item id) in `order`.
    async fn list(
        &self,
        conversation_id: &str,
        after: Option<&str>,
        limit: usize,
        order: SortOrder,
    ) -> Result<Page<ThreadItem>, PersistenceError>;

    /// Overwrites the stored item with the same id.
    async fn replace(&self, conversation_id: &str, item: ThreadItem)
        -> Result<(), PersistenceError>;

    async fn load_item(
        &self,
        conversation_id: &str,
        item_id: &str,
    ) -> Result<Option<ThreadItem>, PersistenceError>;
}

/// Transcript store kept in memory, in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryTranscriptStore {
    threads: Arc<RwLock<HashMap<String, Vec<ThreadItem>>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items of a conversation, oldest first.
    pub async fn items(&self, conversation_id: &str) -> Vec<ThreadItem> {
        self.threads
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn check_id(item: &ThreadItem) -> Result<(), PersistenceError> {
    if is_placeholder_id(item.id()) {
        return Err(PersistenceError::PlaceholderId(item.id().to_string()));
    }
    Ok(())
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, conversation_id: &str, item: ThreadItem) -> Result<(), PersistenceError> {
        check_id(&item)?;
        let mut threads = self.threads.write().await;
        let items = threads.entry(conversation_id.to_string()).or_default();
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(PersistenceError::DuplicateItem(item.id().to_string()));
        }
        items.push(item);
        Ok(())
    }

    async fn list(
        &self,
        conversation_id: &str,
        after: Option<&str>,
        limit: usize,
        order: SortOrder,
    ) -> Result<Page<ThreadItem>, PersistenceError> {
        let threads = self.threads.read().await;
        let mut items: Vec<&ThreadItem> = threads
            .get(conversation_id)
            .map(|items| items.iter().collect())
            .unwrap_or_default();
        if order == SortOrder::Desc {
            items.reverse();
        }

        let start = match after {
            Some(cursor) => items
                .iter()
                .position(|item| item.id() == cursor)
                .map(|index| index + 1)
                .ok_or_else(|| PersistenceError::ItemNotFound(cursor.to_string()))?,
            None => 0,
        };

        let remaining = &items[start..];
        let data: Vec<ThreadItem> = remaining
            .iter()
            .take(limit)
            .map(|item| (*item).clone())
            .collect();
        let has_more = remaining.len() > data.len();
        let after = data.last().map(|item| item.id().to_string());
        Ok(Page {
            data,
            has_more,
            after,
        })
    }

    async fn replace(&self, conversation_id: &str, item: ThreadItem) -> Result<(), PersistenceError> {
        check_id(&item)?;
        let mut threads = self.threads.write().await;
        let slot = threads
            .get_mut(conversation_id)
            .and_then(|items| items.iter_mut().find(|existing| existing.id() == item.id()))
            .ok_or_else(|| PersistenceError::ItemNotFound(item.id().to_string()))?;
        *slot = item;
        Ok(())
    }

    async fn load_item(
        &self,
        conversation_id: &str,
        item_id: &str,
    ) -> Result<Option<ThreadItem>, PersistenceError> {
        Ok(self
            .threads
            .read()
            .await
            .get(conversation_id)
            .and_then(|items| items.iter().find(|item| item.id() == item_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::FAKE_ITEM_ID;

    fn message(id: &str) -> ThreadItem {
        ThreadItem::user_message(id, "c1", id)
    }

    #[tokio::test]
    async fn test_append_rejects_placeholder_and_duplicates() {
        let store = InMemoryTranscriptStore::new();
        let result = store.append("c1", message(FAKE_ITEM_ID)).await;
        assert!(matches!(result, Err(PersistenceError::PlaceholderId(_))));

        store.append("c1", message("i1")).await.unwrap();
        let result = store.append("c1", message("i1")).await;
        assert!(matches!(result, Err(PersistenceError::DuplicateItem(_))));
    }

    #[tokio::test]
    async fn test_list_pages_in_both_orders() {
        let store = InMemoryTranscriptStore::new();
        for id in ["i1", "i2", "i3"] {
            store.append("c1", message(id)).await.unwrap();
        }

        let first = store.list("c1", None, 2, SortOrder::Asc).await.unwrap();
        let ids: Vec<&str> = first.data.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["i1", "i2"]);
        assert!(first.has_more);

        let second = store
            .list("c1", first.after.as_deref(), 2, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(second.data.len(), 1);
        assert!(!second.has_more);

        let latest = store.list("c1", None, 1, SortOrder::Desc).await.unwrap();
        assert_eq!(latest.data[0].id(), "i3");
    }

    #[tokio::test]
    async fn test_replace_updates_in_place() {
        let store = InMemoryTranscriptStore::new();
        store.append("c1", message("i1")).await.unwrap();
        store.append("c1", message("i2")).await.unwrap();

        store
            .replace("c1", ThreadItem::user_message("i1", "c1", "edited"))
            .await
            .unwrap();

        let items = store.items("c1").await;
        assert_eq!(items.len(), 2);
        match &items[0] {
            ThreadItem::UserMessage(item) => assert_eq!(item.text(), "edited"),
            other => panic!("unexpected item {:?}", other),
        }

        let missing = store.replace("c1", message("nope")).await;
        assert!(matches!(missing, Err(PersistenceError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_item_by_id() {
        let store = InMemoryTranscriptStore::new();
        store.append("c1", message("i1")).await.unwrap();
        store.append("c1", message("i2")).await.unwrap();

        let item = store.load_item("c1", "i2").await.unwrap();
        assert_eq!(item.map(|item| item.id().to_string()), Some("i2".to_string()));
        assert!(store.load_item("c1", "i9").await.unwrap().is_none());
        assert!(store.load_item("c2", "i1").await.unwrap().is_none());
    }
}
