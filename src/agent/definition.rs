use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::schemas::Verdict;
use crate::tools::{Tool, ToolSpec};

use super::{AgentError, InterruptConfig};

pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o";

/// Everything needed to run an agent: model, instructions, tools and the
/// per-tool approval rules.
#[derive(Clone)]
pub struct AgentDefinition {
    pub id: String,
    /// Principal owning the agent. `None` means shared by everyone.
    pub owner: Option<String>,
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<Arc<dyn Tool>>,
    /// Overrides of `Tool::needs_approval` keyed by tool name
    pub interrupt_on: HashMap<String, InterruptConfig>,
    /// Tools after which the run stops and hands control to the client
    pub stop_at_tools: Vec<String>,
    pub model_settings: Value,
}

impl AgentDefinition {
    pub fn new<S: Into<String>>(id: S, name: S, instructions: S) -> Self {
        Self {
            id: id.into(),
            owner: None,
            name: name.into(),
            model: DEFAULT_AGENT_MODEL.to_string(),
            instructions: instructions.into(),
            tools: Vec::new(),
            interrupt_on: HashMap::new(),
            stop_at_tools: Vec::new(),
            model_settings: Value::Object(Default::default()),
        }
    }

    pub fn with_owner<S: Into<String>>(mut self, owner: S) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_interrupt_on<S: Into<String>>(mut self, tool: S, config: InterruptConfig) -> Self {
        self.interrupt_on.insert(tool.into(), config);
        self
    }

    pub fn with_stop_at_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.stop_at_tools.push(tool.into());
        self
    }

    pub fn with_model_settings(mut self, settings: Value) -> Self {
        self.model_settings = settings;
        self
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Sorted tool names.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|tool| tool.name()).collect();
        names.sort();
        names
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn is_stop_at_tool(&self, name: &str) -> bool {
        self.stop_at_tools.iter().any(|tool| tool == name)
    }

    pub fn interrupt_config(&self, tool: &str) -> Option<&InterruptConfig> {
        self.interrupt_on.get(tool)
    }

    /// Decides whether a call must pause for a human verdict.
    ///
    /// An explicit `interrupt_on` entry wins over the tool's own predicate.
    pub async fn requires_approval(
        &self,
        tool: &dyn Tool,
        arguments: &Value,
        call_id: &str,
    ) -> bool {
        match self.interrupt_on.get(&tool.name()) {
            Some(config) => config.enabled,
            None => tool.needs_approval(arguments, call_id).await,
        }
    }

    /// Checks a verdict against the tool's allowed decisions.
    pub fn check_verdict(&self, tool: &str, verdict: Verdict) -> Result<(), AgentError> {
        match self.interrupt_on.get(tool) {
            Some(config) if !config.allows(verdict) => Err(AgentError::DecisionNotAllowed {
                tool: tool.to_string(),
                verdict: verdict.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// SHA-256 over the name, instructions and sorted tool names.
    ///
    /// Two definitions with the same fingerprint can resume each other's runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.instructions.as_bytes());
        for name in self.tool_names() {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for AgentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDefinition")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tool_names())
            .field("stop_at_tools", &self.stop_at_tools)
            .finish()
    }
}
