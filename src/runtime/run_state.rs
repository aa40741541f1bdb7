use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentDefinition;
use crate::schemas::{InputItem, Verdict};

/// Raw tool-call record as the model produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Correlation id minted by the tool-call mechanism
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// A tool call paused until a human decides on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interruption {
    /// Wrapper id. Minted per process and not kept across serialization;
    /// match on `raw_item.call_id` instead.
    #[serde(skip, default = "new_interruption_id")]
    pub id: String,
    pub agent_name: String,
    pub raw_item: ToolCallRecord,
}

fn new_interruption_id() -> String {
    format!("intr_{}", uuid::Uuid::new_v4().simple())
}

impl Interruption {
    pub fn new<S: Into<String>>(agent_name: S, raw_item: ToolCallRecord) -> Self {
        Self {
            id: new_interruption_id(),
            agent_name: agent_name.into(),
            raw_item,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.raw_item.call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.raw_item.name
    }

    pub fn arguments(&self) -> &Value {
        &self.raw_item.arguments
    }
}

/// Snapshot of an in-flight agent run.
///
/// Holds only plain data. Request-scoped collaborators are handed to the
/// runtime separately on every pass and can never end up in here.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub conversation_id: String,
    pub agent_name: String,
    /// Fingerprint of the agent definition that produced this state
    pub agent_fingerprint: Option<String>,
    /// Model round trips made so far
    pub current_turn: u32,
    /// Input of the first pass, with the conversation history already merged in
    pub original_input: Vec<InputItem>,
    /// Everything the run produced since: assistant messages, calls, outputs
    pub generated_items: Vec<InputItem>,
    /// Open suspensions, in the order the model requested the calls
    pub interruptions: Vec<Interruption>,
    /// Verdicts applied but not yet consumed by the runtime, keyed by call id
    pub decisions: BTreeMap<String, Verdict>,
}

impl RunState {
    pub fn new<S: Into<String>>(conversation_id: S, agent: &AgentDefinition) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            agent_name: agent.name.clone(),
            agent_fingerprint: Some(agent.fingerprint()),
            current_turn: 0,
            original_input: Vec::new(),
            generated_items: Vec::new(),
            interruptions: Vec::new(),
            decisions: BTreeMap::new(),
        }
    }

    pub fn with_original_input(mut self, input: Vec<InputItem>) -> Self {
        self.original_input = input;
        self
    }

    /// Items the run owns: its merged original input followed by the trace.
    pub fn run_items(&self) -> Vec<InputItem> {
        self.original_input
            .iter()
            .chain(self.generated_items.iter())
            .cloned()
            .collect()
    }

    pub fn is_suspended(&self) -> bool {
        !self.interruptions.is_empty()
    }

    /// Records a verdict for one suspension. Others stay untouched.
    pub fn apply_decision(&mut self, call_id: &str, verdict: Verdict) {
        self.decisions.insert(call_id.to_string(), verdict);
    }

    pub fn approve(&mut self, call_id: &str) {
        self.apply_decision(call_id, Verdict::Approve);
    }

    pub fn reject(&mut self, call_id: &str) {
        self.apply_decision(call_id, Verdict::Reject);
    }

    pub fn verdict_for(&self, call_id: &str) -> Option<Verdict> {
        self.decisions.get(call_id).copied()
    }

    /// Suspensions still waiting for a verdict.
    pub fn open_interruptions(&self) -> impl Iterator<Item = &Interruption> {
        self.interruptions
            .iter()
            .filter(|interruption| !self.decisions.contains_key(interruption.call_id()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(call_id: &str) -> ToolCallRecord {
        ToolCallRecord {
            call_id: call_id.into(),
            name: "get_weather".into(),
            arguments: json!({"location": "Berkeley"}),
        }
    }

    #[test]
    fn test_decision_only_touches_one_suspension() {
        let agent = AgentDefinition::new("a1", "Weather", "x");
        let mut state = RunState::new("c1", &agent);
        state.interruptions.push(Interruption::new("Weather", call("call_1")));
        state.interruptions.push(Interruption::new("Weather", call("call_2")));

        state.approve("call_1");

        let open: Vec<&str> = state.open_interruptions().map(|i| i.call_id()).collect();
        assert_eq!(open, vec!["call_2"]);
        assert_eq!(state.verdict_for("call_1"), Some(Verdict::Approve));
        assert_eq!(state.verdict_for("call_2"), None);
    }

    #[test]
    fn test_wrapper_id_not_serialized() {
        let interruption = Interruption::new("Weather", call("call_1"));
        let value = serde_json::to_value(&interruption).unwrap();
        assert!(value.get("id").is_none());

        let back: Interruption = serde_json::from_value(value).unwrap();
        assert_ne!(back.id, interruption.id);
        assert_eq!(back.raw_item, interruption.raw_item);
    }

    #[test]
    fn test_run_items_order() {
        let agent = AgentDefinition::new("a1", "Weather", "x");
        let mut state =
            RunState::new("c1", &agent).with_original_input(vec![InputItem::user("hello")]);
        state.generated_items.push(InputItem::assistant("hi"));
        assert_eq!(
            state.run_items(),
            vec![InputItem::user("hello"), InputItem::assistant("hi")]
        );
    }
}
