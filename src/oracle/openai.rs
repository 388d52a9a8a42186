//! OpenAI-compatible oracle adapter
//!
//! Talks to any chat-completions endpoint that supports strict JSON-schema
//! structured output. One request per invocation: the engine's contract is
//! that oracle failures surface to the caller rather than being retried
//! behind its back.

use crate::oracle::{ChatMessage, ChatRole, DecisionOracle, DecisionSchema, OracleError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for the OpenAI-compatible oracle
#[derive(Debug, Clone)]
pub struct OpenAiOracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiOracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Decision oracle backed by an OpenAI-compatible chat-completions API
pub struct OpenAiOracle {
    config: OpenAiOracleConfig,
    client: Client,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiOracleConfig) -> Result<Self, OracleError> {
        if config.api_key.is_empty() {
            return Err(OracleError::NotConfigured(
                "oracle API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn convert_message(message: &ChatMessage) -> WireMessage {
        WireMessage {
            role: match message.role {
                ChatRole::System => "system".to_string(),
                ChatRole::Human => "user".to_string(),
            },
            content: Some(message.content.clone()),
        }
    }

    fn build_request(&self, messages: &[ChatMessage], schema: &DecisionSchema) -> WireRequest {
        WireRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::convert_message).collect(),
            temperature: Some(self.config.temperature),
            response_format: WireResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: WireJsonSchema {
                    name: schema.name.clone(),
                    strict: Some(true),
                    schema: schema.schema.clone(),
                },
            },
        }
    }

    /// Extract and parse the reply content from a completion response
    fn parse_reply(response: WireResponse) -> Result<Value, OracleError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Malformed("no choices in oracle reply".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| OracleError::Malformed("empty content in oracle reply".to_string()))?;

        serde_json::from_str(&content).map_err(|e| {
            warn!(error = %e, reply = %content, "Oracle reply is not valid JSON");
            OracleError::Malformed(format!("reply is not valid JSON: {e}"))
        })
    }
}

#[async_trait]
impl DecisionOracle for OpenAiOracle {
    fn name(&self) -> &str {
        "openai"
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        schema: &DecisionSchema,
    ) -> Result<Value, OracleError> {
        let request = self.build_request(messages, schema);
        debug!(
            message_count = messages.len(),
            schema = %schema.name,
            model = %self.config.model,
            "Invoking decision oracle"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let detail = format!(
                    "HTTP request failed: {e} (is_connect: {}, is_timeout: {})",
                    e.is_connect(),
                    e.is_timeout()
                );
                OracleError::Unavailable(detail)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::Unavailable(format!(
                "oracle API error: {status} - {error_text}"
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("unparseable completion body: {e}")))?;

        Self::parse_reply(wire)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: WireResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: WireJsonSchema,
}

#[derive(Debug, Serialize)]
struct WireJsonSchema {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict: Option<bool>,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}
