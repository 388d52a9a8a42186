//! Decision oracle abstraction
//!
//! The oracle is the external decision-making service (an LLM behind a
//! structured-output API). Every invocation carries the full conversation
//! plus a JSON schema constraining the reply; the oracle never returns free
//! text. The engine validates replies against the call site's schema at the
//! boundary, so adapters only guarantee "some JSON object came back".

pub mod openai;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use openai::{OpenAiOracle, OpenAiOracleConfig};

/// A single message as the oracle sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Message roles in an oracle conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Human,
}

/// Reply shape for the rewrite/clarify step: a single text field
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TextReply {
    pub text: String,
}

/// Reply shape for agent-selection steps: one name out of an enum
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AgentChoice {
    pub agent: String,
}

/// A named JSON schema constraining one oracle reply
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionSchema {
    /// Schema name, surfaced to structured-output APIs
    pub name: String,
    /// The JSON Schema object
    pub schema: Value,
}

impl DecisionSchema {
    /// Schema for the query rewrite/clarify step: `{ "text": string }`
    pub fn text_reply() -> Self {
        let schema = schemars::schema_for!(TextReply);
        Self {
            name: "query_rewrite".to_string(),
            schema: serde_json::to_value(schema).expect("schema serializes"),
        }
    }

    /// Schema whose `agent` field is constrained to the given names.
    ///
    /// Built by hand rather than derived: the enum values are only known at
    /// call time.
    pub fn agent_choice(allowed: &[String]) -> Self {
        let schema = json!({
            "title": "AgentChoice",
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "enum": allowed,
                }
            },
            "required": ["agent"],
            "additionalProperties": false,
        });

        Self {
            name: "agent_choice".to_string(),
            schema,
        }
    }

    /// Validate a reply against this schema.
    ///
    /// Returns the joined violation messages on failure.
    pub fn validate(&self, reply: &Value) -> Result<(), String> {
        let validator = jsonschema::validator_for(&self.schema)
            .map_err(|e| format!("Schema compilation error: {e}"))?;

        validator.validate(reply).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            error_messages.join("; ")
        })
    }
}

/// Oracle adapter errors, converted to [`crate::error::TriageError`] at the
/// engine boundary
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
    #[error("Oracle request failed: {0}")]
    Unavailable(String),
    #[error("Oracle reply malformed: {0}")]
    Malformed(String),
}

impl From<OracleError> for crate::error::TriageError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::NotConfigured(msg) | OracleError::Unavailable(msg) => {
                crate::error::TriageError::oracle_unavailable(msg)
            }
            OracleError::Malformed(msg) => crate::error::TriageError::oracle_malformed(msg),
        }
    }
}

/// The external decision-making service
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Adapter name (e.g. "openai", "mock")
    fn name(&self) -> &str;

    /// Invoke the oracle with a structured conversation and an output schema.
    ///
    /// Returns the parsed JSON reply. Transport failures and timeouts map to
    /// [`OracleError::Unavailable`]; non-JSON replies to
    /// [`OracleError::Malformed`]. Never retried internally.
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        schema: &DecisionSchema,
    ) -> Result<Value, OracleError>;
}
