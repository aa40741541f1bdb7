mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;

use chatkit_resume::error::ChatKitError;
use chatkit_resume::interrupts::MatchError;
use chatkit_resume::language_models::ModelResponse;
use chatkit_resume::persistence::RunStateKey;
use chatkit_resume::persistence::RunStateStore;
use chatkit_resume::runtime::{CodecError, RunStateCodec};
use chatkit_resume::schemas::{
    is_placeholder_id, Decision, ThreadItem, ThreadStreamEvent, ToolCallStatus,
};
use chatkit_resume::server::RequestContext;

use common::{collect, harness, harness_with_tools, ChargeCardTool, ReceiptTool};

fn key() -> RunStateKey {
    RunStateKey::new("c1", "user_1")
}

fn done_items(events: &[ThreadStreamEvent]) -> Vec<&ThreadItem> {
    events
        .iter()
        .filter(|event| event.is_done())
        .filter_map(|event| event.item())
        .collect()
}

fn berkeley_call(call_id: &str) -> ModelResponse {
    ModelResponse::tool_call(call_id, "get_weather", json!({"location": "Berkeley"}))
}

#[tokio::test]
async fn fresh_turn_without_suspension() {
    let h = harness(vec![ModelResponse::text("Hi there!")]);

    let events = collect(
        h.server
            .respond(&h.ctx, "c1", Some("hello".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let done = done_items(&events);
    assert_eq!(done.len(), 2);
    assert!(matches!(done[0], ThreadItem::UserMessage(_)));
    match done[1] {
        ThreadItem::AssistantMessage(message) => assert_eq!(message.text(), "Hi there!"),
        other => panic!("unexpected item {:?}", other),
    }
    assert!(!done.iter().any(|item| matches!(item, ThreadItem::Widget(_))));
    assert!(h.run_states.load(&key()).await.unwrap().is_none());

    let stored = h.transcript.items("c1").await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|item| !is_placeholder_id(item.id())));
}

#[tokio::test]
async fn added_and_done_carry_the_same_id() {
    let h = harness(vec![ModelResponse::text("Hi there!")]);
    let events = collect(
        h.server
            .respond(&h.ctx, "c1", Some("hello".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let added = events
        .iter()
        .find(|event| matches!(event, ThreadStreamEvent::ItemAdded { .. }))
        .unwrap();
    let done = events.last().unwrap();
    assert!(done.is_done());
    assert_eq!(added.item_id(), done.item_id());
    assert!(events.iter().all(|event| !is_placeholder_id(event.item_id())));
    assert!(done.to_sse().unwrap().starts_with("data: "));
}

#[tokio::test]
async fn suspend_then_approve() {
    let h = harness(vec![
        berkeley_call("call_42"),
        ModelResponse::text("It is sunny in Berkeley."),
    ]);

    let events = collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;

    match events.last().and_then(ThreadStreamEvent::item) {
        Some(ThreadItem::Widget(widget)) => {
            assert_eq!(widget.widget.key(), Some("approval_call_42"));
            assert!(widget.copy_text.as_deref().unwrap().contains("get_weather"));
        }
        other => panic!("expected an approval widget, got {:?}", other),
    }
    let stored = h.run_states.load(&key()).await.unwrap().unwrap();
    assert!(stored.document.to_string().contains("call_42"));
    assert_eq!(h.weather_runs.load(Ordering::SeqCst), 0);

    let events = collect(
        h.server
            .handle_decision(&h.ctx, Decision::approve("c1", "call_42"))
            .await
            .unwrap(),
    )
    .await;

    let done = done_items(&events);
    match done[0] {
        ThreadItem::ToolCall(call) => {
            assert_eq!(call.call_id, "call_42");
            assert_eq!(call.status, ToolCallStatus::Completed);
            assert_eq!(call.output, Some(json!("Sunny in Berkeley")));
        }
        other => panic!("unexpected item {:?}", other),
    }
    match done.last() {
        Some(ThreadItem::AssistantMessage(message)) => {
            assert_eq!(message.text(), "It is sunny in Berkeley.")
        }
        other => panic!("expected a final assistant message, got {:?}", other),
    }
    assert_eq!(h.weather_runs.load(Ordering::SeqCst), 1);
    assert!(h.run_states.load(&key()).await.unwrap().is_none());

    let ids: HashSet<String> = h
        .transcript
        .items("c1")
        .await
        .iter()
        .map(|item| item.id().to_string())
        .collect();
    assert_eq!(ids.len(), h.transcript.items("c1").await.len());
}

#[tokio::test]
async fn suspend_then_reject() {
    let h = harness(vec![
        berkeley_call("call_42"),
        ModelResponse::text("Okay, I will not check the weather."),
    ]);

    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;
    collect(
        h.server
            .handle_decision(&h.ctx, Decision::reject("c1", "call_42"))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(h.weather_runs.load(Ordering::SeqCst), 0);
    let transcript = h.transcript.items("c1").await;
    let calls: Vec<_> = transcript
        .iter()
        .filter_map(|item| match item {
            ThreadItem::ToolCall(call) => Some(call),
            _ => None,
        })
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].status, ToolCallStatus::Rejected);
    assert!(calls[0].output.is_none());
    assert!(h.run_states.load(&key()).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_decision_is_rejected_without_touching_the_transcript() {
    let h = harness(vec![berkeley_call("call_42"), ModelResponse::text("Sunny.")]);

    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;
    collect(
        h.server
            .handle_decision(&h.ctx, Decision::approve("c1", "call_42"))
            .await
            .unwrap(),
    )
    .await;
    let before = h.transcript.items("c1").await;

    let err = h
        .server
        .handle_decision(&h.ctx, Decision::approve("c1", "call_42"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatKitError::MissingPersistedState(_)));
    assert_eq!(h.transcript.items("c1").await, before);
}

#[tokio::test]
async fn unmatched_decision_keeps_state() {
    let h = harness(vec![berkeley_call("call_42")]);
    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let err = h
        .server
        .handle_decision(&h.ctx, Decision::approve("c1", "call_999"))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ChatKitError::UnmatchedDecision(MatchError::Unmatched(_))
    ));
    assert!(h.run_states.load(&key()).await.unwrap().is_some());
}

#[tokio::test]
async fn decision_from_another_principal_finds_no_state() {
    let h = harness(vec![berkeley_call("call_42")]);
    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let intruder = RequestContext::new("user_2", "weather");
    let err = h
        .server
        .handle_decision(&intruder, Decision::approve("c1", "call_42"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatKitError::MissingPersistedState(_)));
}

#[tokio::test]
async fn parallel_suspensions_resolve_one_at_a_time() {
    let h = harness(vec![
        berkeley_call("call_1").with_tool_call(
            "call_2",
            "get_weather",
            json!({"location": "Berkeley"}),
        ),
        ModelResponse::text("Both lookups are done."),
    ]);

    let events = collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather twice".to_string()))
            .await
            .unwrap(),
    )
    .await;
    let widgets = done_items(&events)
        .into_iter()
        .filter(|item| matches!(item, ThreadItem::Widget(_)))
        .count();
    assert_eq!(widgets, 2);

    let events = collect(
        h.server
            .handle_decision(&h.ctx, Decision::approve("c1", "call_1"))
            .await
            .unwrap(),
    )
    .await;
    assert!(!done_items(&events)
        .iter()
        .any(|item| matches!(item, ThreadItem::Widget(_))));
    assert!(h.run_states.load(&key()).await.unwrap().is_some());
    assert_eq!(h.model.calls(), 1);

    collect(
        h.server
            .handle_decision(&h.ctx, Decision::approve("c1", "call_2"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(h.weather_runs.load(Ordering::SeqCst), 2);
    assert_eq!(h.model.calls(), 2);
    assert!(h.run_states.load(&key()).await.unwrap().is_none());
}

#[tokio::test]
async fn client_tool_output_starts_a_new_turn() {
    let h = harness(vec![
        ModelResponse::tool_call("call_t", "switch_theme", json!({"theme": "Dark"})),
        ModelResponse::text("Switched to dark mode."),
    ]);

    let events = collect(
        h.server
            .respond(&h.ctx, "c1", Some("Go dark".to_string()))
            .await
            .unwrap(),
    )
    .await;
    match done_items(&events).last() {
        Some(ThreadItem::ToolCall(call)) => {
            assert_eq!(call.status, ToolCallStatus::Pending);
            assert_eq!(call.arguments, json!({"theme": "dark"}));
        }
        other => panic!("expected a pending client call, got {:?}", other),
    }
    assert!(h.run_states.load(&key()).await.unwrap().is_none());

    let events = collect(
        h.server
            .submit_client_tool_output(&h.ctx, "c1", "call_t", json!({"theme": "dark"}))
            .await
            .unwrap(),
    )
    .await;
    assert!(matches!(
        done_items(&events).last(),
        Some(ThreadItem::AssistantMessage(_))
    ));
    assert_eq!(*h.model.inputs.lock().unwrap(), vec![1, 3]);

    let completed = h.transcript.items("c1").await.into_iter().any(|item| {
        matches!(item, ThreadItem::ToolCall(call) if call.status == ToolCallStatus::Completed)
    });
    assert!(completed);

    let err = h
        .server
        .submit_client_tool_output(&h.ctx, "c1", "call_t", json!({}))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatKitError::ClientToolCallNotFound { .. }));
}

#[tokio::test]
async fn concurrent_decisions_are_serialized() {
    let h = harness(vec![berkeley_call("call_42"), ModelResponse::text("Sunny.")]);
    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let first = h
        .server
        .handle_decision(&h.ctx, Decision::approve("c1", "call_42"))
        .await
        .unwrap();

    let second = {
        let server = h.server.clone();
        let ctx = h.ctx.clone();
        tokio::spawn(async move {
            server
                .handle_decision(&ctx, Decision::approve("c1", "call_42"))
                .await
                .err()
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!second.is_finished());

    collect(first).await;
    let err = second.await.unwrap();
    assert!(matches!(err, Some(ChatKitError::MissingPersistedState(_))));
    assert_eq!(h.weather_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_agent_is_rejected() {
    let h = harness(vec![]);
    let ctx = RequestContext::new("user_1", "nobody");
    let err = h
        .server
        .respond(&ctx, "c1", Some("hi".to_string()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatKitError::AgentNotFound(_)));
    assert!(h.transcript.items("c1").await.is_empty());
}

#[tokio::test]
async fn dropped_stream_keeps_the_conversation_locked_until_the_pass_ends() {
    let finished = Arc::new(AtomicUsize::new(0));
    let h = harness_with_tools(
        vec![
            ModelResponse::tool_call("call_7", "charge_card", json!({"amount": 20})),
            ModelResponse::text("Your card was charged."),
            ModelResponse::text("You're welcome."),
        ],
        vec![Arc::new(ChargeCardTool {
            delay: Duration::from_millis(200),
            finished: finished.clone(),
        })],
    );
    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Charge my card".to_string()))
            .await
            .unwrap(),
    )
    .await;
    assert!(h.run_states.load(&key()).await.unwrap().is_some());

    let resumed = h
        .server
        .handle_decision(&h.ctx, Decision::approve("c1", "call_7"))
        .await
        .unwrap();
    drop(resumed);

    let next = h
        .server
        .respond(&h.ctx, "c1", Some("Thanks".to_string()))
        .await
        .unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    let stored = h.transcript.items("c1").await;
    assert!(stored.iter().any(|item| matches!(
        item,
        ThreadItem::ToolCall(call)
            if call.call_id == "call_7" && call.status == ToolCallStatus::Completed
    )));
    assert!(stored.iter().any(|item| matches!(
        item,
        ThreadItem::AssistantMessage(message) if message.text() == "Your card was charged."
    )));
    assert!(h.run_states.load(&key()).await.unwrap().is_none());

    let events = collect(next).await;
    match done_items(&events).last() {
        Some(ThreadItem::AssistantMessage(message)) => {
            assert_eq!(message.text(), "You're welcome.")
        }
        other => panic!("expected a final assistant message, got {:?}", other),
    }
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resumed_tool_gets_fresh_collaborators() {
    let h = harness_with_tools(
        vec![
            ModelResponse::tool_call("call_9", "send_receipt", json!({})),
            ModelResponse::text("Receipt sent."),
        ],
        vec![Arc::new(ReceiptTool)],
    );
    collect(
        h.server
            .respond(&h.ctx, "c1", Some("Send my receipt".to_string()))
            .await
            .unwrap(),
    )
    .await;

    let events = collect(
        h.server
            .handle_decision(&h.ctx, Decision::approve("c1", "call_9"))
            .await
            .unwrap(),
    )
    .await;
    let done = done_items(&events);

    let receipt = done
        .iter()
        .find_map(|item| match item {
            ThreadItem::Widget(widget) if widget.widget.key() == Some("receipt") => Some(widget),
            _ => None,
        })
        .expect("receipt widget streamed by the resumed tool");
    assert!(!is_placeholder_id(&receipt.id));

    let call = done
        .iter()
        .find_map(|item| match item {
            ThreadItem::ToolCall(call) if call.call_id == "call_9" => Some(call),
            _ => None,
        })
        .unwrap();
    // The user message and the approval widget.
    assert_eq!(call.output, Some(json!({"seen_items": 2})));

    let widgets = h
        .transcript
        .items("c1")
        .await
        .into_iter()
        .filter(|item| matches!(item, ThreadItem::Widget(_)))
        .count();
    assert_eq!(widgets, 2);
}

#[tokio::test]
async fn unserializable_state_fails_the_turn_without_saving() {
    let h = harness(vec![berkeley_call("call_42")]);
    let server = h
        .server
        .clone()
        .with_codec(RunStateCodec::new().with_max_document_bytes(64));

    let results: Vec<_> = server
        .respond(&h.ctx, "c1", Some("Weather in Berkeley?".to_string()))
        .await
        .unwrap()
        .collect()
        .await;

    match results.last() {
        Some(Err(ChatKitError::CodecError(CodecError::SerializationError(_)))) => {}
        other => panic!("expected a serialization error, got {:?}", other),
    }
    assert!(h.run_states.load(&key()).await.unwrap().is_none());
    assert!(!h
        .transcript
        .items("c1")
        .await
        .iter()
        .any(|item| matches!(item, ThreadItem::Widget(_))));
}
