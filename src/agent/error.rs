use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent loader error: {0}")]
    LoaderError(String),

    #[error("Invalid agent definition: {0}")]
    InvalidDefinition(String),

    #[error("Tool '{tool}' does not accept the verdict '{verdict}'")]
    DecisionNotAllowed { tool: String, verdict: String },
}
