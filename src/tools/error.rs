use thiserror::Error;

/// Tool 相关的所有错误类型
#[derive(Error, Debug)]
pub enum ToolError {
    // ============ 执行错误 ============
    #[error("Execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // ============ 输入验证错误 ============
    #[error("Invalid input: {0}")]
    InvalidInputError(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    // ============ 运行时上下文错误 ============
    #[error("Missing runtime collaborator: {0}")]
    MissingCollaborator(String),

    #[error("Event stream closed")]
    StreamClosed,
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        ToolError::ExecutionError(s)
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::InvalidInputError(e.to_string())
    }
}
