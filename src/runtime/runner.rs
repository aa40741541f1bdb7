use std::sync::Arc;

use chrono::Utc;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::AgentDefinition;
use crate::language_models::{ChatModel, ModelRequest, TokenUsage};
use crate::persistence::TranscriptStore;
use crate::schemas::{
    AssistantMessageItem, InputItem, TextContent, ThreadItem, ThreadStreamEvent, ToolCallItem,
    ToolCallStatus, Verdict, FAKE_ITEM_ID,
};
use crate::tools::{
    create_stream_writer, output_to_string, ChannelStreamWriter, StreamWriter, ToolContext,
    ToolError, ToolRuntime,
};

use super::error::RuntimeError;
use super::merge::{HistoryMerge, REJECTED_TOOL_OUTPUT};
use super::run_state::{Interruption, RunState, ToolCallRecord};

pub const DEFAULT_MAX_TURNS: u32 = 10;
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Where a pass starts from.
#[derive(Debug, Clone)]
pub enum RunInput {
    /// New items of a fresh turn
    Fresh(Vec<InputItem>),
    /// A reconstructed run with decisions applied
    Resume(RunState),
}

/// Request-scoped collaborators for one pass, built fresh by the caller.
#[derive(Clone)]
pub struct RunContext {
    pub conversation_id: String,
    pub tool_context: Arc<dyn ToolContext>,
    pub transcript: Option<Arc<dyn TranscriptStore>>,
}

impl RunContext {
    pub fn new<S: Into<String>>(conversation_id: S, tool_context: Arc<dyn ToolContext>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            tool_context,
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptStore>) -> Self {
        self.transcript = Some(transcript);
        self
    }
}

pub struct RunRequest {
    pub agent: Arc<AgentDefinition>,
    pub input: RunInput,
    pub history: Vec<InputItem>,
    pub merge: Arc<dyn HistoryMerge>,
    pub context: RunContext,
}

/// What a drained pass left behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Open suspensions. Empty when the run completed.
    pub interruptions: Vec<Interruption>,
    pub final_output: Option<String>,
    /// Tokens reported by the model over the whole pass
    pub usage: TokenUsage,
    state: RunState,
}

impl RunOutcome {
    fn from_state(state: RunState, final_output: Option<String>) -> Self {
        Self {
            interruptions: state.interruptions.clone(),
            final_output,
            usage: TokenUsage::default(),
            state,
        }
    }

    pub fn is_suspended(&self) -> bool {
        !self.interruptions.is_empty()
    }

    /// Exports the run state for persistence.
    pub fn to_state(&self) -> RunState {
        self.state.clone()
    }

    pub fn into_state(self) -> RunState {
        self.state
    }
}

/// Resolves once the pass behind a [`StreamedRun`] has finished.
pub struct OutcomeHandle {
    receiver: oneshot::Receiver<Result<RunOutcome, RuntimeError>>,
}

impl OutcomeHandle {
    pub async fn wait(self) -> Result<RunOutcome, RuntimeError> {
        self.receiver.await.map_err(|_| RuntimeError::OutcomeLost)?
    }
}

/// Live events of a pass plus its eventual outcome.
///
/// Drain `events` first; the outcome is only complete after the stream ends.
pub struct StreamedRun {
    pub events: BoxStream<'static, ThreadStreamEvent>,
    pub outcome: OutcomeHandle,
}

/// Model/tool execution runtime.
pub trait AgentRuntime: Send + Sync {
    fn run_streamed(&self, request: RunRequest) -> StreamedRun;
}

/// Runtime looping model calls and tool executions until the model answers
/// without tool calls, a call needs approval, or a stop-at tool ran.
pub struct ToolLoopRuntime {
    model: Arc<dyn ChatModel>,
    max_turns: u32,
    event_buffer: usize,
}

impl ToolLoopRuntime {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_turns: DEFAULT_MAX_TURNS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }
}

impl AgentRuntime for ToolLoopRuntime {
    fn run_streamed(&self, request: RunRequest) -> StreamedRun {
        let (writer, receiver) = create_stream_writer(self.event_buffer);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let pass = ExecutionPass {
            model: self.model.clone(),
            max_turns: self.max_turns,
            writer: Arc::new(writer),
        };

        tokio::spawn(async move {
            let result = pass.run(request).await;
            if let Err(e) = &result {
                log::warn!("Execution pass failed: {}", e);
            }
            let _ = outcome_tx.send(result);
        });

        StreamedRun {
            events: ReceiverStream::new(receiver).boxed(),
            outcome: OutcomeHandle {
                receiver: outcome_rx,
            },
        }
    }
}

enum CallResult {
    Continue,
    Stop,
}

struct ExecutionPass {
    model: Arc<dyn ChatModel>,
    max_turns: u32,
    writer: Arc<ChannelStreamWriter>,
}

impl ExecutionPass {
    async fn run(self, request: RunRequest) -> Result<RunOutcome, RuntimeError> {
        let mut usage = TokenUsage::default();
        let mut outcome = self.run_pass(request, &mut usage).await?;
        outcome.usage = usage;
        Ok(outcome)
    }

    async fn run_pass(
        &self,
        request: RunRequest,
        usage: &mut TokenUsage,
    ) -> Result<RunOutcome, RuntimeError> {
        let RunRequest {
            agent,
            input,
            history,
            merge,
            context,
        } = request;

        let mut state = match input {
            RunInput::Fresh(items) => RunState::new(context.conversation_id.clone(), &agent)
                .with_original_input(merge.merge(history, items)),
            RunInput::Resume(mut state) => {
                let items = state.run_items();
                state.original_input = merge.merge(history, items);
                state.generated_items.clear();
                state
            }
        };

        if state.is_suspended() {
            log::info!(
                "Resuming run for {} with {} suspension(s)",
                state.conversation_id,
                state.interruptions.len()
            );
            let mut still_open = Vec::new();
            let mut stop = false;
            for interruption in std::mem::take(&mut state.interruptions) {
                match state.decisions.remove(interruption.call_id()) {
                    Some(Verdict::Approve) => {
                        let record = interruption.raw_item;
                        if let CallResult::Stop =
                            self.execute_call(&agent, &context, &mut state, &record).await?
                        {
                            stop = true;
                        }
                    }
                    Some(Verdict::Reject) => {
                        self.reject_call(&context, &mut state, &interruption.raw_item)
                            .await?;
                    }
                    None => still_open.push(interruption),
                }
            }
            state.interruptions = still_open;
            if state.is_suspended() {
                log::info!(
                    "Run for {} still has {} open suspension(s)",
                    state.conversation_id,
                    state.interruptions.len()
                );
                return Ok(RunOutcome::from_state(state, None));
            }
            if stop {
                return Ok(RunOutcome::from_state(state, None));
            }
        }

        let mut final_output = None;
        loop {
            if state.current_turn >= self.max_turns {
                return Err(RuntimeError::MaxTurnsExceeded(self.max_turns));
            }
            state.current_turn += 1;

            let input = state.run_items();
            let response = self
                .model
                .respond(ModelRequest {
                    model: &agent.model,
                    instructions: &agent.instructions,
                    input: &input,
                    tools: agent.tool_specs(),
                    settings: &agent.model_settings,
                })
                .await?;
            log::debug!(
                "Turn {} of {}: {} tool call(s)",
                state.current_turn,
                state.conversation_id,
                response.tool_calls.len()
            );
            if let Some(tokens) = &response.tokens {
                usage.add(tokens);
            }

            if let Some(text) = response.text.filter(|text| !text.is_empty()) {
                self.emit_assistant_message(&context.conversation_id, &text)
                    .await?;
                state.generated_items.push(InputItem::assistant(text.clone()));
                final_output = Some(text);
            }

            if response.tool_calls.is_empty() {
                log::info!("Run for {} completed", state.conversation_id);
                return Ok(RunOutcome::from_state(state, final_output));
            }

            let mut stop = false;
            for call in response.tool_calls {
                state.generated_items.push(InputItem::function_call(
                    call.call_id.clone(),
                    call.name.clone(),
                    call.arguments.clone(),
                ));
                let record = ToolCallRecord {
                    call_id: call.call_id,
                    name: call.name,
                    arguments: call.arguments,
                };

                let gated = match agent.tool(&record.name) {
                    Some(tool) => {
                        agent
                            .requires_approval(tool.as_ref(), &record.arguments, &record.call_id)
                            .await
                    }
                    None => false,
                };
                if gated {
                    log::info!(
                        "Tool call {} ({}) needs approval",
                        record.call_id,
                        record.name
                    );
                    state
                        .interruptions
                        .push(Interruption::new(agent.name.clone(), record));
                } else if let CallResult::Stop =
                    self.execute_call(&agent, &context, &mut state, &record).await?
                {
                    stop = true;
                }
            }

            if state.is_suspended() {
                return Ok(RunOutcome::from_state(state, final_output));
            }
            if stop {
                log::info!("Run for {} stopped at a client tool", state.conversation_id);
                return Ok(RunOutcome::from_state(state, final_output));
            }
        }
    }

    async fn execute_call(
        &self,
        agent: &AgentDefinition,
        context: &RunContext,
        state: &mut RunState,
        record: &ToolCallRecord,
    ) -> Result<CallResult, RuntimeError> {
        let Some(tool) = agent.tool(&record.name) else {
            log::warn!("Model requested unknown tool {}", record.name);
            let output = Value::String(ToolError::ToolNotFound(record.name.clone()).to_string());
            self.record_output(context, state, record, ToolCallStatus::Completed, output)
                .await?;
            return Ok(CallResult::Continue);
        };

        let mut runtime = ToolRuntime::new(
            context.tool_context.clone(),
            context.conversation_id.clone(),
            record.call_id.clone(),
        )
        .with_stream_writer(self.writer.clone());
        if let Some(transcript) = &context.transcript {
            runtime = runtime.with_transcript(transcript.clone());
        }

        let output = match tool.run(record.arguments.clone(), &runtime).await {
            Ok(output) => output,
            Err(ToolError::StreamClosed) => return Err(RuntimeError::StreamClosed),
            Err(e) => {
                log::warn!("Tool {} failed: {}", record.name, e);
                Value::String(format!("Error running tool {}: {}", record.name, e))
            }
        };

        if !agent.is_stop_at_tool(&record.name) {
            self.record_output(context, state, record, ToolCallStatus::Completed, output)
                .await?;
            return Ok(CallResult::Continue);
        }

        match runtime.take_client_tool_call().await {
            Some(client_call) => {
                self.emit(ThreadStreamEvent::done(ThreadItem::ToolCall(ToolCallItem {
                    id: FAKE_ITEM_ID.to_string(),
                    thread_id: context.conversation_id.clone(),
                    created_at: Utc::now(),
                    call_id: record.call_id.clone(),
                    name: client_call.name,
                    arguments: client_call.arguments,
                    status: ToolCallStatus::Pending,
                    output: None,
                })))
                .await?;
            }
            None => {
                self.record_output(context, state, record, ToolCallStatus::Completed, output)
                    .await?;
            }
        }
        Ok(CallResult::Stop)
    }

    async fn reject_call(
        &self,
        context: &RunContext,
        state: &mut RunState,
        record: &ToolCallRecord,
    ) -> Result<(), RuntimeError> {
        log::info!("Tool call {} ({}) rejected", record.call_id, record.name);
        let output = Value::String(REJECTED_TOOL_OUTPUT.to_string());
        self.record_output(context, state, record, ToolCallStatus::Rejected, output)
            .await
    }

    async fn record_output(
        &self,
        context: &RunContext,
        state: &mut RunState,
        record: &ToolCallRecord,
        status: ToolCallStatus,
        output: Value,
    ) -> Result<(), RuntimeError> {
        state.generated_items.push(InputItem::function_call_output(
            record.call_id.clone(),
            output_to_string(&output),
        ));
        let output = match status {
            ToolCallStatus::Completed => Some(output),
            ToolCallStatus::Pending | ToolCallStatus::Rejected => None,
        };
        self.emit(ThreadStreamEvent::done(ThreadItem::ToolCall(ToolCallItem {
            id: FAKE_ITEM_ID.to_string(),
            thread_id: context.conversation_id.clone(),
            created_at: Utc::now(),
            call_id: record.call_id.clone(),
            name: record.name.clone(),
            arguments: record.arguments.clone(),
            status,
            output,
        })))
        .await
    }

    async fn emit_assistant_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<(), RuntimeError> {
        let mut item = AssistantMessageItem {
            id: FAKE_ITEM_ID.to_string(),
            thread_id: thread_id.to_string(),
            created_at: Utc::now(),
            content: Vec::new(),
        };
        self.emit(ThreadStreamEvent::added(ThreadItem::AssistantMessage(item.clone())))
            .await?;
        self.emit(ThreadStreamEvent::delta(FAKE_ITEM_ID, text)).await?;
        item.content.push(TextContent::new(text));
        self.emit(ThreadStreamEvent::done(ThreadItem::AssistantMessage(item)))
            .await
    }

    async fn emit(&self, event: ThreadStreamEvent) -> Result<(), RuntimeError> {
        self.writer
            .write(event)
            .await
            .map_err(|_| RuntimeError::StreamClosed)
    }
}
