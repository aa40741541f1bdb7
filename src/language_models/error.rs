use serde_json::Error as SerdeJsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] SerdeJsonError),

    #[error("Model returned no output")]
    EmptyResponse,

    #[error("Error: {0}")]
    OtherError(String),
}
