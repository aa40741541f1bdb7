//! Durable storage for suspended runs and conversation transcripts.

mod error;
pub use error::*;

mod store;
pub use store::{RunStateKey, RunStateStore, StoredRunState};

mod memory;
pub use memory::*;

#[cfg(feature = "sqlite-persistence")]
mod sqlite;
#[cfg(feature = "sqlite-persistence")]
pub use sqlite::*;

mod transcript;
pub use transcript::*;
