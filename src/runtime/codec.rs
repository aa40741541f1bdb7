use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::agent::AgentDefinition;
use crate::schemas::{InputItem, Verdict};

use super::error::CodecError;
use super::run_state::{Interruption, RunState};

/// Version written into every document.
pub const RUN_STATE_SCHEMA_VERSION: u64 = 1;

const FIELD_SCHEMA_VERSION: &str = "$schemaVersion";
const FIELD_CONVERSATION_ID: &str = "conversation_id";
const FIELD_AGENT_NAME: &str = "agent_name";
const FIELD_AGENT_FINGERPRINT: &str = "agent_fingerprint";
const FIELD_CURRENT_TURN: &str = "current_turn";
const FIELD_ORIGINAL_INPUT: &str = "original_input";
const FIELD_GENERATED_ITEMS: &str = "generated_items";
const FIELD_INTERRUPTIONS: &str = "interruptions";
const FIELD_DECISIONS: &str = "decisions";

/// Fields a document cannot be resumed without.
const REQUIRED_FIELDS: &[&str] = &[
    FIELD_CONVERSATION_ID,
    FIELD_AGENT_NAME,
    FIELD_ORIGINAL_INPUT,
    FIELD_INTERRUPTIONS,
];

/// A field dropped while serializing.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiagnostic {
    pub field: String,
    pub reason: String,
}

/// Serialized run state plus the fields that could not be kept.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRunState {
    pub document: Value,
    pub dropped: Vec<FieldDiagnostic>,
}

impl EncodedRunState {
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Converts run states to opaque JSON documents and back.
///
/// Only the fields listed here are persisted. Each optional field is encoded
/// on its own so a bad one costs that field, not the document. A document
/// missing a required field is never produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStateCodec {
    max_document_bytes: Option<usize>,
}

impl RunStateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse documents whose JSON text exceeds `limit` bytes.
    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = Some(limit);
        self
    }

    pub fn serialize(&self, state: &RunState) -> Result<EncodedRunState, CodecError> {
        let encoded = encode_fields(vec![
            (FIELD_CONVERSATION_ID, serde_json::to_value(&state.conversation_id)),
            (FIELD_AGENT_NAME, serde_json::to_value(&state.agent_name)),
            (FIELD_AGENT_FINGERPRINT, serde_json::to_value(&state.agent_fingerprint)),
            (FIELD_CURRENT_TURN, serde_json::to_value(state.current_turn)),
            (FIELD_ORIGINAL_INPUT, serde_json::to_value(&state.original_input)),
            (FIELD_GENERATED_ITEMS, serde_json::to_value(&state.generated_items)),
            (FIELD_INTERRUPTIONS, serde_json::to_value(&state.interruptions)),
            (FIELD_DECISIONS, serde_json::to_value(&state.decisions)),
        ])?;

        if let Some(limit) = self.max_document_bytes {
            let size = serde_json::to_vec(&encoded.document)
                .map_err(|e| CodecError::SerializationError(e.to_string()))?
                .len();
            if size > limit {
                return Err(CodecError::SerializationError(format!(
                    "document is {} bytes, limit is {}",
                    size, limit
                )));
            }
        }
        Ok(encoded)
    }

    /// Rebuilds a run state for `agent`.
    ///
    /// The document must come from an agent with the same name and
    /// fingerprint, and every open interruption must name a tool the agent
    /// still has.
    pub fn deserialize(
        &self,
        document: &Value,
        agent: &AgentDefinition,
    ) -> Result<RunState, CodecError> {
        let fields = document
            .as_object()
            .ok_or_else(|| CodecError::InvalidDocument("expected a JSON object".to_string()))?;

        let version = fields
            .get(FIELD_SCHEMA_VERSION)
            .and_then(Value::as_u64)
            .ok_or_else(|| CodecError::InvalidDocument(format!("missing {}", FIELD_SCHEMA_VERSION)))?;
        if version != RUN_STATE_SCHEMA_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let conversation_id: String = required(fields, FIELD_CONVERSATION_ID)?;
        let agent_name: String = required(fields, FIELD_AGENT_NAME)?;
        let original_input: Vec<InputItem> = required(fields, FIELD_ORIGINAL_INPUT)?;
        let interruptions: Vec<Interruption> = required(fields, FIELD_INTERRUPTIONS)?;
        let agent_fingerprint: Option<String> = optional(fields, FIELD_AGENT_FINGERPRINT)?.flatten();
        let current_turn: u32 = optional(fields, FIELD_CURRENT_TURN)?.unwrap_or_default();
        let generated_items: Vec<InputItem> =
            optional(fields, FIELD_GENERATED_ITEMS)?.unwrap_or_default();
        let decisions: BTreeMap<String, Verdict> =
            optional(fields, FIELD_DECISIONS)?.unwrap_or_default();

        if agent_name != agent.name {
            return Err(CodecError::IncompatibleAgent {
                expected: agent_name,
                found: agent.name.clone(),
            });
        }
        match &agent_fingerprint {
            Some(fingerprint) if *fingerprint != agent.fingerprint() => {
                return Err(CodecError::IncompatibleAgent {
                    expected: format!("{} ({})", agent_name, fingerprint),
                    found: format!("{} ({})", agent.name, agent.fingerprint()),
                });
            }
            Some(_) => {}
            None => log::warn!(
                "Run state for {} has no agent fingerprint, resuming with {} unchecked",
                conversation_id,
                agent.name
            ),
        }
        if let Some(missing) = interruptions
            .iter()
            .find(|interruption| agent.tool(interruption.tool_name()).is_none())
        {
            return Err(CodecError::IncompatibleAgent {
                expected: format!("{} with tool {}", agent_name, missing.tool_name()),
                found: format!("{} without it", agent.name),
            });
        }

        Ok(RunState {
            conversation_id,
            agent_name,
            agent_fingerprint,
            current_turn,
            original_input,
            generated_items,
            interruptions,
            decisions,
        })
    }
}

fn encode_fields(
    fields: Vec<(&'static str, Result<Value, serde_json::Error>)>,
) -> Result<EncodedRunState, CodecError> {
    let mut document = Map::new();
    let mut dropped = Vec::new();
    let mut failed_required = Vec::new();

    for (field, encoded) in fields {
        match encoded {
            Ok(value) => {
                document.insert(field.to_string(), value);
            }
            Err(e) if REQUIRED_FIELDS.contains(&field) => {
                failed_required.push(format!("{}: {}", field, e));
            }
            Err(e) => {
                log::warn!("Dropping run state field '{}': {}", field, e);
                dropped.push(FieldDiagnostic {
                    field: field.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !failed_required.is_empty() {
        return Err(CodecError::SerializationError(failed_required.join("; ")));
    }

    document.insert(
        FIELD_SCHEMA_VERSION.to_string(),
        Value::from(RUN_STATE_SCHEMA_VERSION),
    );
    Ok(EncodedRunState {
        document: Value::Object(document),
        dropped,
    })
}

fn required<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Result<T, CodecError> {
    optional(fields, name)?
        .ok_or_else(|| CodecError::InvalidDocument(format!("missing field {}", name)))
}

fn optional<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &str,
) -> Result<Option<T>, CodecError> {
    fields
        .get(name)
        .map(|value| {
            serde_json::from_value(value.clone())
                .map_err(|e| CodecError::InvalidDocument(format!("field {}: {}", name, e)))
        })
        .transpose()
}
