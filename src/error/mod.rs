//! 统一的错误处理模块
//!
//! 汇总各子模块的错误类型，并提供顶层错误 `ChatKitError`。
//! 结构性错误（无法匹配的决策、缺失的运行状态、整体序列化失败）
//! 总是返回给调用方；字段级错误与重复事件只在本地记录日志。

pub mod utils;

pub use crate::agent::AgentError;
pub use crate::interrupts::MatchError;
pub use crate::language_models::ModelError;
pub use crate::persistence::PersistenceError;
pub use crate::runtime::{CodecError, RuntimeError};
pub use crate::server::TurnPhase;
pub use crate::tools::ToolError;
pub use utils::*;

/// 统一的错误枚举，组合所有子模块错误
#[derive(thiserror::Error, Debug)]
pub enum ChatKitError {
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] PersistenceError),

    /// 决策无法匹配到任何未决的挂起点
    #[error("Unmatched decision: {0}")]
    UnmatchedDecision(#[from] MatchError),

    #[error("Runtime error: {0}")]
    RuntimeError(#[from] RuntimeError),

    #[error("Tool error: {0}")]
    ToolError(#[from] ToolError),

    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),

    #[error("Agent error: {0}")]
    AgentError(#[from] AgentError),

    /// 决策到达时该会话没有已保存的运行状态
    #[error("No suspended run for conversation {0}")]
    MissingPersistedState(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("No pending client tool call {call_id} in conversation {conversation_id}")]
    ClientToolCallNotFound {
        conversation_id: String,
        call_id: String,
    },

    #[error("Invalid turn transition from {from} to {to}")]
    InvalidTransition { from: TurnPhase, to: TurnPhase },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// 便利的类型别名
pub type Result<T> = std::result::Result<T, ChatKitError>;
