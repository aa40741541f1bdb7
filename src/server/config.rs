use std::str::FromStr;
use std::sync::Arc;

use crate::agent::DEFAULT_AGENT_MODEL;
use crate::error::ChatKitError;
use crate::language_models::ChatModel;
use crate::runtime::{ToolLoopRuntime, DEFAULT_EVENT_BUFFER, DEFAULT_MAX_TURNS};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Tunables of the chat server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Model round trips allowed per execution pass
    pub max_turns: u32,
    /// Capacity of the event channels between runtime, controller and client
    pub event_buffer: usize,
    /// Transcript items loaded as history for a fresh turn
    pub history_limit: usize,
    /// Model for agents that do not name one
    pub default_model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            event_buffer: DEFAULT_EVENT_BUFFER,
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_model: DEFAULT_AGENT_MODEL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_default_model<S: Into<String>>(mut self, model: S) -> Self {
        self.default_model = model.into();
        self
    }

    /// Reads `CHATKIT_MAX_TURNS`, `CHATKIT_EVENT_BUFFER`,
    /// `CHATKIT_HISTORY_LIMIT` and `DEFAULT_AGENT_MODEL`, falling back to
    /// the defaults for unset variables.
    pub fn from_env() -> Result<Self, ChatKitError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ChatKitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max_turns: parse_var(&lookup, "CHATKIT_MAX_TURNS", defaults.max_turns)?,
            event_buffer: parse_var(&lookup, "CHATKIT_EVENT_BUFFER", defaults.event_buffer)?,
            history_limit: parse_var(&lookup, "CHATKIT_HISTORY_LIMIT", defaults.history_limit)?,
            default_model: lookup("DEFAULT_AGENT_MODEL")
                .filter(|model| !model.trim().is_empty())
                .unwrap_or(defaults.default_model),
        })
    }

    /// Builds the reference runtime with this configuration's limits.
    pub fn runtime(&self, model: Arc<dyn ChatModel>) -> ToolLoopRuntime {
        ToolLoopRuntime::new(model)
            .with_max_turns(self.max_turns)
            .with_event_buffer(self.event_buffer)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ChatKitError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ChatKitError::ConfigurationError(format!("{} must be a number, got {:?}", key, raw))
        }),
    }
}
