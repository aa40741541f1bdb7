use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Human verdict on a suspended tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approve => write!(f, "approve"),
            Verdict::Reject => write!(f, "reject"),
        }
    }
}

/// Payload carried by the approve/reject actions of an approval widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalActionPayload {
    pub action: Verdict,
    /// Correlation id of the suspended tool call.
    #[serde(default)]
    pub interruption_id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub tool_arguments: Value,
}

/// External decision resolving one suspension of a conversation's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub conversation_id: String,
    /// Required for matching; `None` is never guessed.
    #[serde(default)]
    pub suspension_correlation_id: Option<String>,
    pub verdict: Verdict,
}

impl Decision {
    pub fn new(
        conversation_id: impl Into<String>,
        suspension_correlation_id: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            suspension_correlation_id: Some(suspension_correlation_id.into()),
            verdict,
        }
    }

    pub fn approve(conversation_id: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(conversation_id, correlation_id, Verdict::Approve)
    }

    pub fn reject(conversation_id: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(conversation_id, correlation_id, Verdict::Reject)
    }

    /// Builds a decision from a clicked approval action.
    pub fn from_action(conversation_id: impl Into<String>, payload: ApprovalActionPayload) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            suspension_correlation_id: payload.interruption_id.filter(|id| !id.is_empty()),
            verdict: payload.action,
        }
    }
}
