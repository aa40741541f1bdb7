use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::PersistenceError;
use super::store::{new_state_ref, RunStateKey, RunStateStore, StoredRunState};

/// In-memory run state store
///
/// This is useful for development and testing. States are lost when the
/// process exits.
#[derive(Clone, Default)]
pub struct InMemoryRunStateStore {
    states: Arc<RwLock<HashMap<RunStateKey, StoredRunState>>>,
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored for `conversation_id` across all owners.
    pub async fn count_for_conversation(&self, conversation_id: &str) -> usize {
        self.states
            .read()
            .await
            .keys()
            .filter(|key| key.conversation_id == conversation_id)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl RunStateStore for InMemoryRunStateStore {
    async fn save(&self, key: &RunStateKey, document: &Value) -> Result<String, PersistenceError> {
        let state_ref = new_state_ref();
        let mut states = self.states.write().await;
        if states.remove(key).is_some() {
            log::debug!("Replacing run state for {}", key.conversation_id);
        }
        states.insert(
            key.clone(),
            StoredRunState {
                state_ref: state_ref.clone(),
                key: key.clone(),
                document: document.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(state_ref)
    }

    async fn load(&self, key: &RunStateKey) -> Result<Option<StoredRunState>, PersistenceError> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &RunStateKey) -> Result<(), PersistenceError> {
        self.states.write().await.remove(key);
        Ok(())
    }
}
