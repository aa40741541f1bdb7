use std::fmt;

use crate::error::ChatKitError;

/// Where a conversation turn stands in the suspend/resume cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    /// No prior state
    #[default]
    Fresh,
    Running,
    /// Open interruptions, state persisted
    Suspended,
    /// Decision applied, not yet resumed
    Resolving,
    /// Persisted state deleted
    Complete,
}

impl TurnPhase {
    pub fn can_transition_to(self, next: TurnPhase) -> bool {
        matches!(
            (self, next),
            (TurnPhase::Fresh, TurnPhase::Running)
                | (TurnPhase::Running, TurnPhase::Suspended)
                | (TurnPhase::Running, TurnPhase::Complete)
                | (TurnPhase::Suspended, TurnPhase::Resolving)
                | (TurnPhase::Resolving, TurnPhase::Running)
        )
    }

    pub fn transition(self, next: TurnPhase) -> Result<TurnPhase, ChatKitError> {
        if !self.can_transition_to(next) {
            return Err(ChatKitError::InvalidTransition {
                from: self,
                to: next,
            });
        }
        log::debug!("Turn phase {} -> {}", self, next);
        Ok(next)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Fresh => "fresh",
            TurnPhase::Running => "running",
            TurnPhase::Suspended => "suspended",
            TurnPhase::Resolving => "resolving",
            TurnPhase::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspend_resume_cycle() {
        let phase = TurnPhase::Fresh
            .transition(TurnPhase::Running)
            .and_then(|p| p.transition(TurnPhase::Suspended))
            .and_then(|p| p.transition(TurnPhase::Resolving))
            .and_then(|p| p.transition(TurnPhase::Running))
            .and_then(|p| p.transition(TurnPhase::Suspended))
            .and_then(|p| p.transition(TurnPhase::Resolving))
            .and_then(|p| p.transition(TurnPhase::Running))
            .and_then(|p| p.transition(TurnPhase::Complete))
            .unwrap();
        assert_eq!(phase, TurnPhase::Complete);
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(TurnPhase::Fresh.transition(TurnPhase::Resolving).is_err());
        assert!(TurnPhase::Suspended.transition(TurnPhase::Running).is_err());
        assert!(TurnPhase::Complete.transition(TurnPhase::Running).is_err());
    }
}
