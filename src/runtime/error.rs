use thiserror::Error;

use crate::language_models::ModelError;

/// Errors raised while converting run states to and from documents.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A required field could not be converted, or the document is too large.
    #[error("Run state could not be serialized: {0}")]
    SerializationError(String),

    #[error("Invalid run state document: {0}")]
    InvalidDocument(String),

    #[error("Unsupported run state schema version {0}")]
    UnsupportedVersion(u64),

    #[error("Run state was produced by agent {expected}, cannot resume with {found}")]
    IncompatibleAgent { expected: String, found: String },
}

/// Errors that end an execution pass.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),

    #[error("Max turns ({0}) exceeded")]
    MaxTurnsExceeded(u32),

    #[error("Event stream consumer went away")]
    StreamClosed,

    #[error("Run ended without reporting an outcome")]
    OutcomeLost,
}
