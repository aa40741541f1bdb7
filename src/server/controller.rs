use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::{AgentDefinition, AgentLoader};
use crate::approval::ApprovalRequestEmitter;
use crate::error::{ChatKitError, Result};
use crate::interrupts::find_interruption;
use crate::normalizer::{normalize_events, DefaultIdGenerator, ItemIdGenerator, NormalizerPass};
use crate::persistence::{RunStateKey, RunStateStore, SortOrder, TranscriptStore};
use crate::runtime::{
    thread_items_to_input, AgentRuntime, FreshTurnMerge, OutcomeHandle, ResumeMerge, RunContext,
    RunInput, RunRequest, RunStateCodec, StreamedRun,
};
use crate::schemas::{
    Decision, InputItem, ItemKind, ThreadItem, ThreadStreamEvent, ToolCallItem, ToolCallStatus,
};

use super::{ConversationLocks, RequestContext, ServerConfig, TurnPhase};

/// Live events of one turn. An `Err` item ends the stream.
pub type EventStream = BoxStream<'static, Result<ThreadStreamEvent>>;

/// Bookkeeping for one execution pass of a conversation.
struct Turn {
    conversation_id: String,
    key: RunStateKey,
    phase: TurnPhase,
    /// Suspensions a previous pass already asked a human about
    already_requested: HashSet<String>,
}

/// Resume controller: drives fresh turns, decisions and client tool
/// outputs through the agent runtime.
///
/// Structural failures (unknown agent, missing state, unmatched decision)
/// are returned before any event is produced. Failures after streaming has
/// started end the stream with an `Err` item.
///
/// Each pass is driven by its own task holding the conversation lock. A
/// client that drops its stream stops receiving events; the pass still runs
/// to the end and its items and run state are persisted before the next
/// request for the conversation proceeds.
#[derive(Clone)]
pub struct ChatKitServer {
    agents: Arc<dyn AgentLoader>,
    runtime: Arc<dyn AgentRuntime>,
    run_states: Arc<dyn RunStateStore>,
    transcript: Arc<dyn TranscriptStore>,
    ids: Arc<dyn ItemIdGenerator>,
    codec: RunStateCodec,
    emitter: ApprovalRequestEmitter,
    locks: ConversationLocks,
    config: ServerConfig,
}

impl ChatKitServer {
    pub fn new(
        agents: Arc<dyn AgentLoader>,
        runtime: Arc<dyn AgentRuntime>,
        run_states: Arc<dyn RunStateStore>,
        transcript: Arc<dyn TranscriptStore>,
    ) -> Self {
        let ids: Arc<dyn ItemIdGenerator> = Arc::new(DefaultIdGenerator);
        Self {
            agents,
            runtime,
            run_states,
            transcript,
            emitter: ApprovalRequestEmitter::new(ids.clone()),
            ids,
            codec: RunStateCodec::new(),
            locks: ConversationLocks::new(),
            config: ServerConfig::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn ItemIdGenerator>) -> Self {
        self.emitter = ApprovalRequestEmitter::new(ids.clone());
        self.ids = ids;
        self
    }

    /// Sets history loading, the default model and the client event buffer.
    ///
    /// `max_turns` only applies to runtimes built with
    /// [`ServerConfig::runtime`]; the server does not reconfigure the
    /// runtime it was given.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_codec(mut self, codec: RunStateCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Arc<dyn TranscriptStore> {
        &self.transcript
    }

    pub fn run_states(&self) -> &Arc<dyn RunStateStore> {
        &self.run_states
    }

    /// Processes a turn, optionally carrying new user input.
    pub async fn respond(
        &self,
        ctx: &RequestContext,
        conversation_id: &str,
        user_text: Option<String>,
    ) -> Result<EventStream> {
        let guard = self.locks.acquire(conversation_id).await;
        self.start_turn(guard, ctx, conversation_id, user_text).await
    }

    /// Applies a human verdict to one suspension and resumes the run.
    pub async fn handle_decision(
        &self,
        ctx: &RequestContext,
        decision: Decision,
    ) -> Result<EventStream> {
        let conversation_id = decision.conversation_id.clone();
        let guard = self.locks.acquire(&conversation_id).await;
        let agent = self.load_agent(ctx).await?;

        let key = RunStateKey::new(conversation_id.clone(), ctx.principal.clone());
        let stored = self
            .run_states
            .load(&key)
            .await?
            .ok_or_else(|| ChatKitError::MissingPersistedState(conversation_id.clone()))?;
        let mut phase = TurnPhase::Suspended;

        let mut state = self.codec.deserialize(&stored.document, &agent)?;
        let (call_id, tool_name) = {
            let interruption = find_interruption(&state, &decision)?;
            (
                interruption.call_id().to_string(),
                interruption.tool_name().to_string(),
            )
        };
        agent.check_verdict(&tool_name, decision.verdict)?;

        phase = phase.transition(TurnPhase::Resolving)?;
        state.apply_decision(&call_id, decision.verdict);
        log::info!(
            "Decision {} for {} ({}) in {}",
            decision.verdict,
            call_id,
            tool_name,
            conversation_id
        );
        let already_requested = state
            .open_interruptions()
            .map(|interruption| interruption.call_id().to_string())
            .collect();

        // The decided state must not survive a crash between here and the
        // end of the resumed pass.
        self.run_states.delete(&key).await?;
        phase = phase.transition(TurnPhase::Running)?;

        let context = RunContext::new(conversation_id.clone(), ctx.tool_context(&conversation_id))
            .with_transcript(self.transcript.clone());
        let run = self.runtime.run_streamed(RunRequest {
            agent,
            input: RunInput::Resume(state),
            history: Vec::new(),
            merge: Arc::new(ResumeMerge),
            context,
        });

        let turn = Turn {
            conversation_id,
            key,
            phase,
            already_requested,
        };
        Ok(self.drive(guard, turn, Vec::new(), run))
    }

    /// Completes a pending client tool call and starts a new turn without
    /// user input.
    pub async fn submit_client_tool_output(
        &self,
        ctx: &RequestContext,
        conversation_id: &str,
        call_id: &str,
        output: Value,
    ) -> Result<EventStream> {
        let guard = self.locks.acquire(conversation_id).await;
        let mut call = self
            .find_pending_tool_call(conversation_id, call_id)
            .await?
            .ok_or_else(|| ChatKitError::ClientToolCallNotFound {
                conversation_id: conversation_id.to_string(),
                call_id: call_id.to_string(),
            })?;

        call.status = ToolCallStatus::Completed;
        call.output = Some(output);
        self.transcript
            .replace(conversation_id, ThreadItem::ToolCall(call))
            .await?;
        log::info!("Client tool call {} completed in {}", call_id, conversation_id);

        self.start_turn(guard, ctx, conversation_id, None).await
    }

    async fn start_turn(
        &self,
        guard: OwnedMutexGuard<()>,
        ctx: &RequestContext,
        conversation_id: &str,
        user_text: Option<String>,
    ) -> Result<EventStream> {
        let agent = self.load_agent(ctx).await?;
        let key = RunStateKey::new(conversation_id.to_string(), ctx.principal.clone());
        if self.run_states.load(&key).await?.is_some() {
            log::warn!(
                "Conversation {} has a suspended run; a new turn will discard it",
                conversation_id
            );
        }

        let history = self.load_history(conversation_id).await?;
        let mut lead = Vec::new();
        let mut new_items = Vec::new();
        if let Some(text) = user_text {
            let id = self
                .ids
                .generate_item_id(ItemKind::UserMessage, conversation_id);
            let item = ThreadItem::user_message(id, conversation_id, text.clone());
            self.transcript.append(conversation_id, item.clone()).await?;
            lead.push(ThreadStreamEvent::done(item));
            new_items.push(InputItem::user(text));
        }

        let phase = TurnPhase::Fresh.transition(TurnPhase::Running)?;
        let context = RunContext::new(conversation_id, ctx.tool_context(conversation_id))
            .with_transcript(self.transcript.clone());
        let run = self.runtime.run_streamed(RunRequest {
            agent,
            input: RunInput::Fresh(new_items),
            history,
            merge: Arc::new(FreshTurnMerge),
            context,
        });

        let turn = Turn {
            conversation_id: conversation_id.to_string(),
            key,
            phase,
            already_requested: HashSet::new(),
        };
        Ok(self.drive(guard, turn, lead, run))
    }

    /// Spawns the task driving a pass and returns the client's view of it.
    ///
    /// The task streams the pass through the normalizer, writes every item
    /// to the transcript, then persists or clears the run state. It holds
    /// the conversation lock until all of that is done.
    fn drive(
        &self,
        guard: OwnedMutexGuard<()>,
        turn: Turn,
        lead: Vec<ThreadStreamEvent>,
        run: StreamedRun,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let server = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let mut client = ClientSink::new(tx, turn.conversation_id.clone());
            server.run_turn(turn, lead, run, &mut client).await;
        });
        ReceiverStream::new(rx).boxed()
    }

    async fn run_turn(
        &self,
        turn: Turn,
        lead: Vec<ThreadStreamEvent>,
        run: StreamedRun,
        client: &mut ClientSink,
    ) {
        for event in lead {
            client.send(Ok(event)).await;
        }

        let StreamedRun { events, outcome } = run;
        let pass = NormalizerPass::new(turn.conversation_id.clone(), self.ids.clone());
        let mut events = Box::pin(normalize_events(events, pass));
        let mut persisted = HashSet::new();
        while let Some(event) = events.next().await {
            if let Err(e) = self
                .persist_event(&turn.conversation_id, &event, &mut persisted)
                .await
            {
                log::warn!("Turn failed for {}: {}", turn.conversation_id, e);
                client.send(Err(e)).await;
                // The pass keeps running until its events are drained.
                while events.next().await.is_some() {}
                if let Err(e) = outcome.wait().await {
                    log::warn!("Abandoned pass for {} failed: {}", turn.conversation_id, e);
                }
                return;
            }
            client.send(Ok(event)).await;
        }

        let conversation_id = turn.conversation_id.clone();
        match self.finish_pass(turn, outcome).await {
            Ok(events) => {
                for event in events {
                    client.send(Ok(event)).await;
                }
            }
            Err(e) => {
                log::warn!("Turn failed for {}: {}", conversation_id, e);
                client.send(Err(e)).await;
            }
        }
    }

    async fn persist_event(
        &self,
        conversation_id: &str,
        event: &ThreadStreamEvent,
        persisted: &mut HashSet<String>,
    ) -> Result<()> {
        let Some(item) = event.item() else {
            return Ok(());
        };
        if persisted.contains(item.id()) {
            self.transcript.replace(conversation_id, item.clone()).await?;
        } else {
            self.transcript.append(conversation_id, item.clone()).await?;
            persisted.insert(item.id().to_string());
        }
        Ok(())
    }

    async fn finish_pass(
        &self,
        turn: Turn,
        outcome: OutcomeHandle,
    ) -> Result<Vec<ThreadStreamEvent>> {
        let outcome = outcome.wait().await?;

        if !outcome.is_suspended() {
            turn.phase.transition(TurnPhase::Complete)?;
            self.run_states.delete(&turn.key).await?;
            log::info!(
                "Turn complete for {} ({} tokens)",
                turn.conversation_id,
                outcome.usage.total_tokens
            );
            return Ok(Vec::new());
        }

        turn.phase.transition(TurnPhase::Suspended)?;
        let state = outcome.into_state();
        let encoded = self.codec.serialize(&state)?;
        let state_ref = self.run_states.save(&turn.key, &encoded.document).await?;
        log::info!(
            "Conversation {} suspended with {} open call(s) as {}",
            turn.conversation_id,
            state.interruptions.len(),
            state_ref
        );

        let mut events = Vec::new();
        for interruption in state
            .interruptions
            .iter()
            .filter(|interruption| !turn.already_requested.contains(interruption.call_id()))
        {
            let item = self
                .emitter
                .emit(&turn.conversation_id, interruption)
                .into_item();
            self.transcript
                .append(&turn.conversation_id, item.clone())
                .await?;
            events.push(ThreadStreamEvent::added(item.clone()));
            events.push(ThreadStreamEvent::done(item));
        }
        Ok(events)
    }

    async fn load_agent(&self, ctx: &RequestContext) -> Result<Arc<AgentDefinition>> {
        let agent = self
            .agents
            .load(&ctx.agent_id, &ctx.principal)
            .await?
            .ok_or_else(|| ChatKitError::AgentNotFound(ctx.agent_id.clone()))?;
        if !agent.model.is_empty() {
            return Ok(agent);
        }
        let agent = agent.as_ref().clone().with_model(self.config.default_model.clone());
        Ok(Arc::new(agent))
    }

    /// The latest `history_limit` transcript items as model input, oldest first.
    async fn load_history(&self, conversation_id: &str) -> Result<Vec<InputItem>> {
        let page = self
            .transcript
            .list(
                conversation_id,
                None,
                self.config.history_limit,
                SortOrder::Desc,
            )
            .await?;
        let mut items = page.data;
        items.reverse();
        Ok(thread_items_to_input(&items))
    }

    async fn find_pending_tool_call(
        &self,
        conversation_id: &str,
        call_id: &str,
    ) -> Result<Option<ToolCallItem>> {
        let limit = self.config.history_limit.max(1);
        let mut after: Option<String> = None;
        loop {
            let page = self
                .transcript
                .list(conversation_id, after.as_deref(), limit, SortOrder::Desc)
                .await?;
            let found = page.data.into_iter().find_map(|item| match item {
                ThreadItem::ToolCall(call)
                    if call.call_id == call_id && call.status == ToolCallStatus::Pending =>
                {
                    Some(call)
                }
                _ => None,
            });
            if found.is_some() || !page.has_more {
                return Ok(found);
            }
            after = page.after;
        }
    }
}

/// Client end of a turn's event stream.
struct ClientSink {
    tx: mpsc::Sender<Result<ThreadStreamEvent>>,
    conversation_id: String,
    connected: bool,
}

impl ClientSink {
    fn new(tx: mpsc::Sender<Result<ThreadStreamEvent>>, conversation_id: String) -> Self {
        Self {
            tx,
            conversation_id,
            connected: true,
        }
    }

    /// Forwards while the client listens. A departed client is not an error.
    async fn send(&mut self, item: Result<ThreadStreamEvent>) {
        if self.connected && self.tx.send(item).await.is_err() {
            self.connected = false;
            log::info!(
                "Client left {}, finishing the turn without it",
                self.conversation_id
            );
        }
    }
}
