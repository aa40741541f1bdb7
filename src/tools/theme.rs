use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ClientToolCall, Tool, ToolError, ToolRuntime};

pub const SWITCH_THEME_TOOL: &str = "switch_theme";

/// Maps a requested color scheme onto `light` or `dark`.
pub fn normalize_color_scheme(value: &str) -> Result<&'static str, ToolError> {
    let normalized = value.trim().to_lowercase();
    match normalized.as_str() {
        "light" => Ok("light"),
        "dark" => Ok("dark"),
        _ if normalized.contains("dark") => Ok("dark"),
        _ if normalized.contains("light") => Ok("light"),
        _ => Err(ToolError::InvalidInputError(format!(
            "Theme must be either 'light' or 'dark', got '{}'",
            value
        ))),
    }
}

/// Client tool asking the frontend to change its color scheme.
///
/// Agents list it among their stop-at tools; the run ends after the call and
/// the client reports the outcome.
#[derive(Debug, Clone, Default)]
pub struct SwitchThemeTool;

#[async_trait]
impl Tool for SwitchThemeTool {
    fn name(&self) -> String {
        SWITCH_THEME_TOOL.to_string()
    }

    fn description(&self) -> String {
        "Switch the chat interface between light and dark color schemes.".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "theme": {
                    "type": "string",
                    "enum": ["light", "dark"]
                }
            },
            "required": ["theme"]
        })
    }

    async fn run(&self, arguments: Value, runtime: &ToolRuntime) -> Result<Value, ToolError> {
        let requested = arguments
            .get("theme")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::MissingInput("theme".to_string()))?;
        let theme = normalize_color_scheme(requested)?;
        log::debug!("switch_theme requested {}", theme);

        runtime
            .set_client_tool_call(ClientToolCall {
                name: SWITCH_THEME_TOOL.to_string(),
                arguments: json!({ "theme": theme }),
            })
            .await;
        Ok(json!({ "theme": theme }))
    }
}
