//! Human-in-the-loop configuration for gated tools.
//!
//! An agent lists the tools that pause for a human verdict before they run,
//! and which verdicts a reviewer may give.

use serde::{Deserialize, Serialize};

use crate::schemas::Verdict;

/// Default allowed decisions when interrupt is enabled with no custom config.
pub const DEFAULT_ALLOWED_DECISIONS: &[Verdict] = &[Verdict::Approve, Verdict::Reject];

/// Per-tool interrupt configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterruptConfig {
    /// Whether to interrupt before this tool.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allowed human decisions. Default: approve and reject.
    #[serde(default = "default_allowed_decisions")]
    pub allowed_decisions: Vec<Verdict>,
}

fn default_true() -> bool {
    true
}

fn default_allowed_decisions() -> Vec<Verdict> {
    DEFAULT_ALLOWED_DECISIONS.to_vec()
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_decisions: default_allowed_decisions(),
        }
    }
}

impl InterruptConfig {
    pub fn enabled() -> Self {
        Self::default()
    }

    /// Never interrupt, even when the tool itself asks for approval.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            allowed_decisions: default_allowed_decisions(),
        }
    }

    pub fn with_allowed_decisions(mut self, decisions: Vec<Verdict>) -> Self {
        self.allowed_decisions = decisions;
        self
    }

    pub fn allows(&self, verdict: Verdict) -> bool {
        self.allowed_decisions.contains(&verdict)
    }
}
