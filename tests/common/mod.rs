#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use chatkit_resume::agent::{AgentDefinition, InMemoryAgentLoader};
use chatkit_resume::language_models::{ChatModel, ModelError, ModelRequest, ModelResponse};
use chatkit_resume::persistence::{InMemoryRunStateStore, InMemoryTranscriptStore, SortOrder};
use chatkit_resume::schemas::{ThreadStreamEvent, WidgetComponent, WidgetRoot};
use chatkit_resume::server::{ChatKitServer, EventStream, RequestContext, ServerConfig};
use chatkit_resume::tools::{SwitchThemeTool, Tool, ToolError, ToolRuntime, SWITCH_THEME_TOOL};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Model replaying canned responses and recording the input it was given.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
    pub inputs: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.inputs.lock().unwrap().push(request.input.len());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ModelError::EmptyResponse)
    }
}

/// Weather lookup that needs approval for Berkeley and counts executions.
pub struct WeatherTool {
    pub runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> String {
        "get_weather".to_string()
    }

    fn description(&self) -> String {
        "Current weather for a location".to_string()
    }

    async fn needs_approval(&self, arguments: &Value, _call_id: &str) -> bool {
        arguments["location"] == "Berkeley"
    }

    async fn run(&self, arguments: Value, _runtime: &ToolRuntime) -> Result<Value, ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let location = arguments["location"].as_str().unwrap_or("somewhere");
        Ok(json!(format!("Sunny in {}", location)))
    }
}

/// Gated payment tool that takes a while and records when it finishes.
pub struct ChargeCardTool {
    pub delay: Duration,
    pub finished: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for ChargeCardTool {
    fn name(&self) -> String {
        "charge_card".to_string()
    }

    fn description(&self) -> String {
        "Charge the saved card".to_string()
    }

    async fn needs_approval(&self, _arguments: &Value, _call_id: &str) -> bool {
        true
    }

    async fn run(&self, arguments: Value, _runtime: &ToolRuntime) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(json!(format!("Charged {}", arguments["amount"])))
    }
}

/// Gated tool that streams a receipt widget and reads the transcript.
pub struct ReceiptTool;

#[async_trait]
impl Tool for ReceiptTool {
    fn name(&self) -> String {
        "send_receipt".to_string()
    }

    fn description(&self) -> String {
        "Show a receipt for the last order".to_string()
    }

    async fn needs_approval(&self, _arguments: &Value, _call_id: &str) -> bool {
        true
    }

    async fn run(&self, _arguments: Value, runtime: &ToolRuntime) -> Result<Value, ToolError> {
        let seen = runtime
            .transcript()?
            .list(&runtime.thread_id, None, 100, SortOrder::Asc)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?
            .data
            .len();
        runtime
            .stream_widget(
                WidgetRoot::Card {
                    key: Some("receipt".to_string()),
                    padding: None,
                    children: vec![WidgetComponent::text("Receipt #1")],
                    confirm: None,
                    cancel: None,
                },
                Some("Receipt #1".to_string()),
            )
            .await?;
        Ok(json!({ "seen_items": seen }))
    }
}

pub struct Harness {
    pub server: ChatKitServer,
    pub model: Arc<ScriptedModel>,
    pub run_states: Arc<InMemoryRunStateStore>,
    pub transcript: Arc<InMemoryTranscriptStore>,
    pub weather_runs: Arc<AtomicUsize>,
    pub ctx: RequestContext,
}

pub fn harness(responses: Vec<ModelResponse>) -> Harness {
    harness_with_tools(responses, Vec::new())
}

/// Harness whose agent also carries `tools`.
pub fn harness_with_tools(responses: Vec<ModelResponse>, tools: Vec<Arc<dyn Tool>>) -> Harness {
    init_logger();
    let weather_runs = Arc::new(AtomicUsize::new(0));
    let agent = AgentDefinition::new("weather", "Weather", "Answer weather questions.")
        .with_tool(Arc::new(WeatherTool {
            runs: weather_runs.clone(),
        }))
        .with_tool(Arc::new(SwitchThemeTool))
        .with_tools(tools)
        .with_stop_at_tool(SWITCH_THEME_TOOL);

    let model = ScriptedModel::new(responses);
    let run_states = Arc::new(InMemoryRunStateStore::new());
    let transcript = Arc::new(InMemoryTranscriptStore::new());
    let config = ServerConfig::default().with_max_turns(5);
    let server = ChatKitServer::new(
        Arc::new(InMemoryAgentLoader::with_agents(vec![agent])),
        Arc::new(config.runtime(model.clone())),
        run_states.clone(),
        transcript.clone(),
    )
    .with_config(config);

    Harness {
        server,
        model,
        run_states,
        transcript,
        weather_runs,
        ctx: RequestContext::new("user_1", "weather"),
    }
}

/// Drains a stream, panicking on the first error.
pub async fn collect(stream: EventStream) -> Vec<ThreadStreamEvent> {
    stream
        .map(|event| event.expect("stream error"))
        .collect()
        .await
}
