use serde_json::{json, Value};

use crate::schemas::{
    ActionConfig, ActionHandler, CardAction, LoadingBehavior, Verdict, WidgetComponent, WidgetRoot,
};

/// Action type carried by the approve and reject buttons.
pub const APPROVAL_ACTION_TYPE: &str = "tool_approval";

/// Renders tool arguments as `k=v` pairs joined by `, `.
///
/// String values are shown without quotes. Empty or null arguments render
/// as `None`.
pub fn format_arguments(arguments: &Value) -> String {
    let rendered = match arguments {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}={}", key, format_value(value)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => format_value(other),
    };
    if rendered.is_empty() {
        "None".to_string()
    } else {
        rendered
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Plain-text fallback for clients that cannot render the card.
pub fn approval_copy_text(agent_name: &str, tool_name: &str, arguments: &Value) -> String {
    format!(
        "Approval required: Agent {} wants to use tool {} with arguments: {}",
        agent_name,
        tool_name,
        format_arguments(arguments)
    )
}

fn approval_action(
    verdict: Verdict,
    label: &str,
    tool_name: &str,
    arguments: &Value,
    correlation_id: &str,
) -> CardAction {
    let payload = json!({
        "action": verdict,
        "interruption_id": correlation_id,
        "tool_name": tool_name,
        "tool_arguments": arguments,
    });
    CardAction {
        label: label.to_string(),
        action: ActionConfig::new(APPROVAL_ACTION_TYPE, payload)
            .with_handler(ActionHandler::Server)
            .with_loading_behavior(LoadingBehavior::Auto),
    }
}

/// Builds the approval card for one suspended tool call.
pub fn render_approval_widget(
    agent_name: &str,
    tool_name: &str,
    arguments: &Value,
    correlation_id: &str,
) -> WidgetRoot {
    let details = WidgetComponent::Container {
        padding: Some(3),
        radius: Some("md".to_string()),
        background: Some("surface-secondary".to_string()),
        children: vec![
            WidgetComponent::Text {
                value: "Tool Details".to_string(),
                size: Some("sm".to_string()),
                weight: Some("semibold".to_string()),
                color: None,
            },
            WidgetComponent::Text {
                value: format!("Tool: {}", tool_name),
                size: Some("sm".to_string()),
                weight: None,
                color: None,
            },
            WidgetComponent::Text {
                value: format!("Arguments: {}", format_arguments(arguments)),
                size: Some("sm".to_string()),
                weight: None,
                color: None,
            },
        ],
    };

    WidgetRoot::Card {
        key: Some(format!("approval_{}", correlation_id)),
        padding: Some(4),
        children: vec![WidgetComponent::Col {
            gap: Some(3),
            children: vec![
                WidgetComponent::Title {
                    value: "Approval Required".to_string(),
                    size: Some("lg".to_string()),
                    weight: Some("semibold".to_string()),
                },
                WidgetComponent::text(format!(
                    "Agent {} wants to use the tool {}",
                    agent_name, tool_name
                )),
                details,
                WidgetComponent::Text {
                    value: "Please approve or reject this tool call to continue.".to_string(),
                    size: Some("sm".to_string()),
                    weight: None,
                    color: Some("secondary".to_string()),
                },
            ],
        }],
        confirm: Some(approval_action(
            Verdict::Approve,
            "Approve",
            tool_name,
            arguments,
            correlation_id,
        )),
        cancel: Some(approval_action(
            Verdict::Reject,
            "Reject",
            tool_name,
            arguments,
            correlation_id,
        )),
    }
}
