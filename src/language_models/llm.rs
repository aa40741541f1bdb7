use async_trait::async_trait;
use serde_json::Value;

use crate::schemas::InputItem;
use crate::tools::ToolSpec;

use super::{ModelError, ModelResponse};

/// Everything the model needs for one agent turn.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub instructions: &'a str,
    pub input: &'a [InputItem],
    pub tools: Vec<ToolSpec>,
    pub settings: &'a Value,
}

/// One model round trip of an agent run.
///
/// Implementations wrap a provider; tests use scripted fakes.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError>;
}
