use thiserror::Error;

/// Why a decision could not be tied to a suspension.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Decision carries no suspension correlation id")]
    MissingCorrelationId,

    #[error("No open suspension with correlation id {0}")]
    Unmatched(String),
}
