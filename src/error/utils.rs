//! 错误代码工具
//!
//! 为不同类型的错误分配稳定的数字代码，便于追踪和分类。

use std::fmt;

use super::{AgentError, ChatKitError, CodecError, MatchError, RuntimeError};

/// 错误代码系统
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 运行状态编解码错误 (1000-1999)
    CodecError = 1000,
    CodecSerializationError = 1001,
    CodecIncompatibleAgent = 1002,

    /// 持久化错误 (2000-2999)
    PersistenceError = 2000,

    /// 决策相关错误 (3000-3999)
    UnmatchedDecision = 3000,
    MissingCorrelationId = 3001,
    MissingPersistedState = 3002,
    ClientToolCallNotFound = 3003,

    /// 运行时错误 (4000-4999)
    RuntimeError = 4000,
    MaxTurnsExceeded = 4001,
    ModelError = 4002,

    /// Agent 相关错误 (5000-5999)
    AgentError = 5000,
    AgentNotFound = 5001,
    DecisionNotAllowed = 5002,

    /// Tool 相关错误 (8000-8999)
    ToolError = 8000,

    /// 通用错误 (9000-9999)
    ConfigurationError = 9000,
    InvalidTransition = 9001,
    JsonError = 9002,
}

impl ErrorCode {
    /// 从 ChatKitError 获取错误代码
    pub fn from_error(error: &ChatKitError) -> Self {
        match error {
            ChatKitError::CodecError(CodecError::SerializationError(_)) => {
                ErrorCode::CodecSerializationError
            }
            ChatKitError::CodecError(CodecError::IncompatibleAgent { .. }) => {
                ErrorCode::CodecIncompatibleAgent
            }
            ChatKitError::CodecError(_) => ErrorCode::CodecError,
            ChatKitError::PersistenceError(_) => ErrorCode::PersistenceError,
            ChatKitError::UnmatchedDecision(MatchError::MissingCorrelationId) => {
                ErrorCode::MissingCorrelationId
            }
            ChatKitError::UnmatchedDecision(_) => ErrorCode::UnmatchedDecision,
            ChatKitError::MissingPersistedState(_) => ErrorCode::MissingPersistedState,
            ChatKitError::ClientToolCallNotFound { .. } => ErrorCode::ClientToolCallNotFound,
            ChatKitError::RuntimeError(RuntimeError::MaxTurnsExceeded(_)) => {
                ErrorCode::MaxTurnsExceeded
            }
            ChatKitError::RuntimeError(RuntimeError::ModelError(_)) | ChatKitError::ModelError(_) => {
                ErrorCode::ModelError
            }
            ChatKitError::RuntimeError(_) => ErrorCode::RuntimeError,
            ChatKitError::AgentError(AgentError::DecisionNotAllowed { .. }) => {
                ErrorCode::DecisionNotAllowed
            }
            ChatKitError::AgentError(_) => ErrorCode::AgentError,
            ChatKitError::AgentNotFound(_) => ErrorCode::AgentNotFound,
            ChatKitError::ToolError(_) => ErrorCode::ToolError,
            ChatKitError::ConfigurationError(_) => ErrorCode::ConfigurationError,
            ChatKitError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ChatKitError::JsonError(_) => ErrorCode::JsonError,
        }
    }

    /// 获取错误代码的数字值
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// 获取错误代码的描述
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::CodecError => "Run state codec failed",
            ErrorCode::CodecSerializationError => "Run state could not be serialized",
            ErrorCode::CodecIncompatibleAgent => "Run state belongs to a different agent",
            ErrorCode::PersistenceError => "Storage operation failed",
            ErrorCode::UnmatchedDecision => "Decision matches no open suspension",
            ErrorCode::MissingCorrelationId => "Decision carries no correlation id",
            ErrorCode::MissingPersistedState => "No suspended run for this conversation",
            ErrorCode::ClientToolCallNotFound => "No pending client tool call",
            ErrorCode::RuntimeError => "Agent run failed",
            ErrorCode::MaxTurnsExceeded => "Agent run exceeded maximum turns",
            ErrorCode::ModelError => "Model call failed",
            ErrorCode::AgentError => "Agent operation failed",
            ErrorCode::AgentNotFound => "Agent not found",
            ErrorCode::DecisionNotAllowed => "Decision not allowed for this tool",
            ErrorCode::ToolError => "Tool operation failed",
            ErrorCode::ConfigurationError => "Configuration error",
            ErrorCode::InvalidTransition => "Invalid turn transition",
            ErrorCode::JsonError => "JSON parsing/serialization failed",
        }
    }

    /// 是否为应直接展示给客户端的拒绝
    pub fn is_client_visible(self) -> bool {
        matches!(
            self,
            ErrorCode::UnmatchedDecision
                | ErrorCode::MissingCorrelationId
                | ErrorCode::MissingPersistedState
                | ErrorCode::ClientToolCallNotFound
                | ErrorCode::AgentNotFound
                | ErrorCode::DecisionNotAllowed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}: {}", self.as_u32(), self.description())
    }
}

/// 获取错误的完整信息，包括错误代码
pub fn error_info(error: &ChatKitError) -> String {
    format!("[{}] {}", ErrorCode::from_error(error), error)
}
