use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AgentDefinition, AgentError};

/// Source of agent definitions.
#[async_trait]
pub trait AgentLoader: Send + Sync {
    /// Loads the agent visible to `principal`. `Ok(None)` means not found.
    async fn load(
        &self,
        agent_id: &str,
        principal: &str,
    ) -> Result<Option<Arc<AgentDefinition>>, AgentError>;
}

/// Agent registry kept in memory.
#[derive(Default)]
pub struct InMemoryAgentLoader {
    agents: RwLock<HashMap<String, Arc<AgentDefinition>>>,
}

impl InMemoryAgentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, agent: AgentDefinition) -> Arc<AgentDefinition> {
        let agent = Arc::new(agent);
        self.agents
            .write()
            .await
            .insert(agent.id.clone(), agent.clone());
        agent
    }

    /// Builds a loader already holding `agents`.
    pub fn with_agents(agents: Vec<AgentDefinition>) -> Self {
        let agents = agents
            .into_iter()
            .map(|agent| (agent.id.clone(), Arc::new(agent)))
            .collect();
        Self {
            agents: RwLock::new(agents),
        }
    }
}

#[async_trait]
impl AgentLoader for InMemoryAgentLoader {
    async fn load(
        &self,
        agent_id: &str,
        principal: &str,
    ) -> Result<Option<Arc<AgentDefinition>>, AgentError> {
        let agents = self.agents.read().await;
        Ok(agents
            .get(agent_id)
            .filter(|agent| agent.owner.as_deref().map_or(true, |owner| owner == principal))
            .cloned())
    }
}
