use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who handles an action when the user clicks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionHandler {
    #[default]
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadingBehavior {
    #[default]
    Auto,
    None,
    #[serde(rename = "self")]
    SelfOnly,
    Container,
}

/// Action dispatched back to the server when a widget control is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub handler: ActionHandler,
    #[serde(default)]
    pub loading_behavior: LoadingBehavior,
}

impl ActionConfig {
    pub fn new<S: Into<String>>(action_type: S, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            handler: ActionHandler::default(),
            loading_behavior: LoadingBehavior::default(),
        }
    }

    pub fn with_handler(mut self, handler: ActionHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_loading_behavior(mut self, loading_behavior: LoadingBehavior) -> Self {
        self.loading_behavior = loading_behavior;
        self
    }
}

/// A labelled card button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAction {
    pub label: String,
    pub action: ActionConfig,
}

/// Nodes of a widget tree. Rendering is left to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetComponent {
    Title {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<String>,
    },
    Text {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    #[serde(rename = "Box")]
    Container {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        padding: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background: Option<String>,
        children: Vec<WidgetComponent>,
    },
    Col {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gap: Option<u32>,
        children: Vec<WidgetComponent>,
    },
    Row {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gap: Option<u32>,
        children: Vec<WidgetComponent>,
    },
}

impl WidgetComponent {
    pub fn text<S: Into<String>>(value: S) -> Self {
        WidgetComponent::Text {
            value: value.into(),
            size: None,
            weight: None,
            color: None,
        }
    }

    pub fn title<S: Into<String>>(value: S) -> Self {
        WidgetComponent::Title {
            value: value.into(),
            size: None,
            weight: None,
        }
    }

    /// Concatenated text of this node and its descendants, one line per leaf.
    pub fn plain_text(&self) -> String {
        match self {
            WidgetComponent::Title { value, .. } | WidgetComponent::Text { value, .. } => {
                value.clone()
            }
            WidgetComponent::Container { children, .. }
            | WidgetComponent::Col { children, .. }
            | WidgetComponent::Row { children, .. } => children
                .iter()
                .map(WidgetComponent::plain_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Root of a widget tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetRoot {
    Card {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        padding: Option<u32>,
        children: Vec<WidgetComponent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirm: Option<CardAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cancel: Option<CardAction>,
    },
}

impl WidgetRoot {
    pub fn key(&self) -> Option<&str> {
        match self {
            WidgetRoot::Card { key, .. } => key.as_deref(),
        }
    }

    pub fn children(&self) -> &[WidgetComponent] {
        match self {
            WidgetRoot::Card { children, .. } => children,
        }
    }

    pub fn actions(&self) -> Vec<&CardAction> {
        match self {
            WidgetRoot::Card {
                confirm, cancel, ..
            } => confirm.iter().chain(cancel.iter()).collect(),
        }
    }

    pub fn plain_text(&self) -> String {
        self.children()
            .iter()
            .map(WidgetComponent::plain_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
