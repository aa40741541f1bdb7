use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::runtime::ToolRuntime;
use super::ToolError;

/// Tool description handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool.
    fn name(&self) -> String;

    /// Provides a description of what the tool does and when to use it.
    fn description(&self) -> String;

    /// JSON schema of the arguments, in the OpenAI function-call shape.
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    /// Whether this particular call must wait for a human decision before it runs.
    ///
    /// The default never asks. Agents can override the answer per tool name.
    async fn needs_approval(&self, _arguments: &Value, _call_id: &str) -> bool {
        false
    }

    /// Executes the tool.
    ///
    /// `runtime` carries the collaborators of the current request; tools
    /// must not keep them past the call.
    async fn run(&self, arguments: Value, runtime: &ToolRuntime) -> Result<Value, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }
}

/// Renders a tool result as the text fed back to the model.
pub fn output_to_string(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
