use crate::schemas::{InputItem, ThreadItem, ToolCallStatus};
use crate::tools::output_to_string;

/// Output recorded for a tool call a human rejected.
pub const REJECTED_TOOL_OUTPUT: &str = "The user rejected this tool call. The tool was not run.";

/// Combines conversation history with the items a pass starts from.
pub trait HistoryMerge: Send + Sync {
    fn merge(&self, history: Vec<InputItem>, new_items: Vec<InputItem>) -> Vec<InputItem>;
}

/// Fresh turn: history followed by the new items.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshTurnMerge;

impl HistoryMerge for FreshTurnMerge {
    fn merge(&self, mut history: Vec<InputItem>, new_items: Vec<InputItem>) -> Vec<InputItem> {
        history.extend(new_items);
        history
    }
}

/// Resumed run: the state already embeds the history it started from, so
/// only its own items are used.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeMerge;

impl HistoryMerge for ResumeMerge {
    fn merge(&self, _history: Vec<InputItem>, new_items: Vec<InputItem>) -> Vec<InputItem> {
        new_items
    }
}

/// Converts stored transcript items into model input.
///
/// Completed tool calls become a call/output pair, rejected ones a pair
/// whose output reports the rejection. Pending client calls and widgets
/// are left out.
pub fn thread_items_to_input(items: &[ThreadItem]) -> Vec<InputItem> {
    let mut input = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ThreadItem::UserMessage(message) => input.push(InputItem::user(message.text())),
            ThreadItem::AssistantMessage(message) => {
                input.push(InputItem::assistant(message.text()))
            }
            ThreadItem::ToolCall(call) => match call.status {
                ToolCallStatus::Pending => {
                    log::debug!("Skipping pending tool call {} in history", call.call_id);
                }
                ToolCallStatus::Completed => {
                    let output = call
                        .output
                        .as_ref()
                        .map(output_to_string)
                        .unwrap_or_default();
                    input.push(InputItem::function_call(
                        call.call_id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    ));
                    input.push(InputItem::function_call_output(call.call_id.clone(), output));
                }
                ToolCallStatus::Rejected => {
                    input.push(InputItem::function_call(
                        call.call_id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    ));
                    input.push(InputItem::function_call_output(
                        call.call_id.clone(),
                        REJECTED_TOOL_OUTPUT,
                    ));
                }
            },
            ThreadItem::Widget(_) => {}
        }
    }
    input
}
