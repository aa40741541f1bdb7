use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod llm;
pub use llm::{ChatModel, ModelRequest};

mod error;
pub use error::*;

/// A tool call requested by the model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RequestedToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Output of one model round trip.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Assistant text, if the model produced any
    pub text: Option<String>,
    pub tool_calls: Vec<RequestedToolCall>,
    pub tokens: Option<TokenUsage>,
}

impl ModelResponse {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn tool_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::default().with_tool_call(call_id, name, arguments)
    }

    pub fn with_tool_call(
        mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        self.tool_calls.push(RequestedToolCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        });
        self
    }

    pub fn with_tokens(mut self, tokens: TokenUsage) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}
