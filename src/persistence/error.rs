use thiserror::Error;

/// Errors that can occur when working with persistence
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item already exists: {0}")]
    DuplicateItem(String),

    #[error("Refusing to store item with placeholder id '{0}'")]
    PlaceholderId(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(feature = "sqlite-persistence")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::DatabaseError(e.to_string())
    }
}
