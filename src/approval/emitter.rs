use std::sync::Arc;

use chrono::Utc;

use crate::normalizer::ItemIdGenerator;
use crate::runtime::Interruption;
use crate::schemas::{ItemKind, ThreadItem, WidgetItem};

use super::{approval_copy_text, render_approval_widget};

/// Interactive request asking a human to decide on one suspended call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub correlation_id: String,
    pub item: WidgetItem,
}

impl ApprovalRequest {
    pub fn into_item(self) -> ThreadItem {
        ThreadItem::Widget(self.item)
    }
}

/// Turns open suspensions into approval widgets with durable ids.
#[derive(Clone)]
pub struct ApprovalRequestEmitter {
    ids: Arc<dyn ItemIdGenerator>,
}

impl ApprovalRequestEmitter {
    pub fn new(ids: Arc<dyn ItemIdGenerator>) -> Self {
        Self { ids }
    }

    pub fn emit(&self, conversation_id: &str, interruption: &Interruption) -> ApprovalRequest {
        let widget = render_approval_widget(
            &interruption.agent_name,
            interruption.tool_name(),
            interruption.arguments(),
            interruption.call_id(),
        );
        let copy_text = approval_copy_text(
            &interruption.agent_name,
            interruption.tool_name(),
            interruption.arguments(),
        );
        log::info!(
            "Requesting approval for {} ({}) in {}",
            interruption.call_id(),
            interruption.tool_name(),
            conversation_id
        );

        ApprovalRequest {
            correlation_id: interruption.call_id().to_string(),
            item: WidgetItem {
                id: self.ids.generate_item_id(ItemKind::Widget, conversation_id),
                thread_id: conversation_id.to_string(),
                created_at: Utc::now(),
                widget,
                copy_text: Some(copy_text),
            },
        }
    }
}
