use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use super::error::PersistenceError;
use super::store::{new_state_ref, RunStateKey, RunStateStore, StoredRunState};

/// SQLite-backed run state store
///
/// One row per `(conversation_id, owner_principal)` in the `run_states`
/// table; the unique constraint backs the single-slot rule.
#[derive(Clone)]
pub struct SqliteRunStateStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRunStateStore {
    /// Create a new store with a database file path
    pub fn new(path: &str) -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create a new store with an in-memory database
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, PersistenceError> {
        Self::setup(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Setup the database schema
    fn setup(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS run_states (
                state_ref TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                owner_principal TEXT NOT NULL,
                state_document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(conversation_id, owner_principal)
            )",
            [],
        )?;
        Ok(())
    }

    /// Number of rows stored for `conversation_id` across all owners.
    pub async fn count_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<usize, PersistenceError> {
        let conn = self.connection.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM run_states WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RunStateStore for SqliteRunStateStore {
    async fn save(&self, key: &RunStateKey, document: &Value) -> Result<String, PersistenceError> {
        let state_ref = new_state_ref();
        let document = serde_json::to_string(document)?;
        let created_at = Utc::now().to_rfc3339();

        let mut conn = self.connection.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM run_states WHERE conversation_id = ?1 AND owner_principal = ?2",
            params![key.conversation_id, key.owner_principal],
        )?;
        tx.execute(
            "INSERT INTO run_states (
                state_ref, conversation_id, owner_principal, state_document, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                state_ref,
                key.conversation_id,
                key.owner_principal,
                document,
                created_at
            ],
        )?;
        tx.commit()?;
        Ok(state_ref)
    }

    async fn load(&self, key: &RunStateKey) -> Result<Option<StoredRunState>, PersistenceError> {
        let row = {
            let conn = self.connection.lock().await;
            conn.query_row(
                "SELECT state_ref, state_document, created_at FROM run_states
                 WHERE conversation_id = ?1 AND owner_principal = ?2",
                params![key.conversation_id, key.owner_principal],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
        };

        let Some((state_ref, document, created_at)) = row else {
            return Ok(None);
        };
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| PersistenceError::DatabaseError(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(StoredRunState {
            state_ref,
            key: key.clone(),
            document: serde_json::from_str(&document)?,
            created_at,
        }))
    }

    async fn delete(&self, key: &RunStateKey) -> Result<(), PersistenceError> {
        let conn = self.connection.lock().await;
        conn.execute(
            "DELETE FROM run_states WHERE conversation_id = ?1 AND owner_principal = ?2",
            params![key.conversation_id, key.owner_principal],
        )?;
        Ok(())
    }
}
