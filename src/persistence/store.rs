use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PersistenceError;

/// Slot a run state lives in: one per conversation and owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunStateKey {
    pub conversation_id: String,
    pub owner_principal: String,
}

impl RunStateKey {
    pub fn new<S: Into<String>>(conversation_id: S, owner_principal: S) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            owner_principal: owner_principal.into(),
        }
    }
}

/// A persisted run-state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRunState {
    /// Reference returned by `save`
    pub state_ref: String,
    pub key: RunStateKey,
    pub document: Value,
    pub created_at: DateTime<Utc>,
}

/// Durable single-slot storage for suspended runs.
///
/// At most one document exists per key. `save` replaces, `load` returns
/// `None` for a conversation that was never suspended and `delete` is
/// idempotent.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    async fn save(&self, key: &RunStateKey, document: &Value) -> Result<String, PersistenceError>;

    async fn load(&self, key: &RunStateKey) -> Result<Option<StoredRunState>, PersistenceError>;

    async fn delete(&self, key: &RunStateKey) -> Result<(), PersistenceError>;
}

pub(crate) fn new_state_ref() -> String {
    format!("rs_{}", uuid::Uuid::new_v4().simple())
}
