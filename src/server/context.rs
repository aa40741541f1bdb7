use std::sync::Arc;

use crate::tools::{RequestToolContext, ToolContext};

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated principal; run states are owned per principal
    pub principal: String,
    pub agent_id: String,
}

impl RequestContext {
    pub fn new<S: Into<String>>(principal: S, agent_id: S) -> Self {
        Self {
            principal: principal.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Fresh tool context for one execution pass.
    pub fn tool_context(&self, conversation_id: &str) -> Arc<dyn ToolContext> {
        Arc::new(
            RequestToolContext::new()
                .with_principal(self.principal.clone())
                .with_conversation_id(conversation_id)
                .with_custom("agent_id", self.agent_id.clone()),
        )
    }
}
