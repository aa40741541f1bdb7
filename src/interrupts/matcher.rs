use crate::runtime::{Interruption, RunState};
use crate::schemas::Decision;

use super::MatchError;

/// Locates the open suspension a decision applies to.
///
/// The key is the correlation id inside the raw tool-call record. The
/// interruption wrapper id is never consulted since it does not survive
/// serialization. An absent correlation id is unmatched, never guessed.
pub fn find_interruption<'a>(
    state: &'a RunState,
    decision: &Decision,
) -> Result<&'a Interruption, MatchError> {
    let correlation_id = decision
        .suspension_correlation_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(MatchError::MissingCorrelationId)?;

    let mut matches = state
        .open_interruptions()
        .filter(|interruption| interruption.call_id() == correlation_id);

    let first = matches
        .next()
        .ok_or_else(|| MatchError::Unmatched(correlation_id.to_string()))?;

    let duplicates = matches.count();
    if duplicates > 0 {
        log::warn!(
            "{} suspensions share correlation id {} in conversation {}; using the first",
            duplicates + 1,
            correlation_id,
            state.conversation_id
        );
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::agent::AgentDefinition;
    use crate::runtime::ToolCallRecord;
    use crate::schemas::Verdict;

    fn state_with(calls: &[(&str, &str)]) -> RunState {
        let agent = AgentDefinition::new("a1", "Weather", "x");
        let mut state = RunState::new("c1", &agent);
        for (call_id, location) in calls {
            state.interruptions.push(Interruption::new(
                "Weather",
                ToolCallRecord {
                    call_id: call_id.to_string(),
                    name: "get_weather".into(),
                    arguments: json!({ "location": location }),
                },
            ));
        }
        state
    }

    #[test]
    fn test_matches_on_call_id() {
        let state = state_with(&[("call_1", "Paris"), ("call_42", "Berkeley")]);
        let found = find_interruption(&state, &Decision::approve("c1", "call_42")).unwrap();
        assert_eq!(found.arguments(), &json!({"location": "Berkeley"}));
    }

    #[test]
    fn test_wrapper_id_is_not_a_key() {
        let state = state_with(&[("call_1", "Paris")]);
        let wrapper_id = state.interruptions[0].id.clone();
        let result = find_interruption(&state, &Decision::approve("c1", wrapper_id.clone()));
        assert_eq!(result, Err(MatchError::Unmatched(wrapper_id)));
    }

    #[test]
    fn test_missing_correlation_id_is_unmatched() {
        let state = state_with(&[("call_1", "Paris")]);
        let decision = Decision {
            conversation_id: "c1".into(),
            suspension_correlation_id: None,
            verdict: Verdict::Approve,
        };
        assert_eq!(
            find_interruption(&state, &decision),
            Err(MatchError::MissingCorrelationId)
        );
    }

    #[test]
    fn test_unknown_correlation_id_is_unmatched() {
        let state = state_with(&[("call_1", "Paris")]);
        let result = find_interruption(&state, &Decision::reject("c1", "call_999"));
        assert_eq!(result, Err(MatchError::Unmatched("call_999".into())));
    }

    #[test]
    fn test_duplicates_resolve_to_first() {
        let state = state_with(&[("call_1", "Paris"), ("call_1", "Berkeley")]);
        let found = find_interruption(&state, &Decision::approve("c1", "call_1")).unwrap();
        assert_eq!(found.arguments(), &json!({"location": "Paris"}));
    }

    #[test]
    fn test_decided_suspension_is_no_longer_open() {
        let mut state = state_with(&[("call_1", "Paris")]);
        state.approve("call_1");
        let result = find_interruption(&state, &Decision::approve("c1", "call_1"));
        assert_eq!(result, Err(MatchError::Unmatched("call_1".into())));
    }
}
