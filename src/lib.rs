//! # chatkit-resume
//!
//! Chat backend core for agents whose tool calls may need a human verdict.
//! A turn runs until the agent either answers or requests a gated tool call;
//! in the latter case the run is suspended, persisted, and an approval
//! request is added to the transcript. A later decision resumes the run from
//! where it stopped.
//!
//! ## Overview
//!
//! - **Run state**: allow-listed run snapshots, a per-field codec and stores (in memory, SQLite)
//! - **Interrupts**: matching decisions to suspended tool calls by correlation id
//! - **Server**: the resume controller, turn phases and per-conversation locking
//! - **Normalizer**: durable ids for streamed items and terminal-event dedup
//! - **Approval**: approval widgets with a plain-text fallback
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatkit_resume::agent::{AgentDefinition, InMemoryAgentLoader};
//! use chatkit_resume::persistence::{InMemoryRunStateStore, InMemoryTranscriptStore};
//! use chatkit_resume::schemas::Decision;
//! use chatkit_resume::server::{ChatKitServer, RequestContext, ServerConfig};
//!
//! # async fn run(model: Arc<dyn chatkit_resume::language_models::ChatModel>) -> chatkit_resume::error::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let agents = InMemoryAgentLoader::with_agents(vec![AgentDefinition::new("a1", "Weather", "Answer briefly.")]);
//! let server = ChatKitServer::new(
//!     Arc::new(agents),
//!     Arc::new(config.runtime(model)),
//!     Arc::new(InMemoryRunStateStore::new()),
//!     Arc::new(InMemoryTranscriptStore::new()),
//! )
//! .with_config(config);
//!
//! let ctx = RequestContext::new("user_1", "a1");
//! let mut events = server.respond(&ctx, "c1", Some("Weather in Berkeley?".into())).await?;
//! // ... forward `events` to the client, then later:
//! let mut resumed = server.handle_decision(&ctx, Decision::approve("c1", "call_42")).await?;
//! # Ok(()) }
//! ```

/// Agent definitions, approval rules and loaders.
pub mod agent;
/// Approval widgets for suspended tool calls.
pub mod approval;
/// Unified error types and utilities.
pub mod error;
/// Matching decisions to suspended tool calls.
pub mod interrupts;
/// Model trait used by the runtime.
pub mod language_models;
/// Durable ids for streamed items.
pub mod normalizer;
/// Run state and transcript storage.
pub mod persistence;
/// Run state, codec, history merge and the execution runtime.
pub mod runtime;
/// Items, events, decisions and widgets.
pub mod schemas;
/// Resume controller, configuration and locking.
pub mod server;
/// Tools: trait, runtime collaborators, stream writer, client tools.
pub mod tools;

pub use error::{ChatKitError, Result};
