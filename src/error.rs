//! Error types for the triage engine
//!
//! One taxonomy covers the whole crate: collaborator failures (oracle, index),
//! catalog lookups, configuration, and the internal ephemeral-balance
//! invariant. Oracle and index adapters keep their own local error enums and
//! convert into [`TriageError`] at the engine boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for triage operations
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Decision oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("Decision oracle returned a malformed response: {message}")]
    OracleMalformedResponse { message: String },

    #[error("Similarity index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("Agent not found in catalog: {name}")]
    AgentNotFound { name: String },

    #[error("Invalid engine state: {message}")]
    InvalidState { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl TriageError {
    /// Create an oracle-unavailable error, sanitizing transport detail
    pub fn oracle_unavailable<S: Into<String>>(message: S) -> Self {
        Self::OracleUnavailable {
            message: sanitize_error_message(&message.into()),
        }
    }

    /// Create an oracle-malformed-response error
    pub fn oracle_malformed<S: Into<String>>(message: S) -> Self {
        Self::OracleMalformedResponse {
            message: message.into(),
        }
    }

    /// Create an index-unavailable error, sanitizing transport detail
    pub fn index_unavailable<S: Into<String>>(message: S) -> Self {
        Self::IndexUnavailable {
            message: sanitize_error_message(&message.into()),
        }
    }

    /// Create an agent-not-found error
    pub fn agent_not_found<S: Into<String>>(name: S) -> Self {
        Self::AgentNotFound { name: name.into() }
    }

    /// Create an invalid-state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

static SECRET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(password|token|key|secret|bearer)[=:]\s*\S+").unwrap());

/// Sanitize transport error messages before they surface to callers.
///
/// Oracle and index errors can carry request detail (auth headers, URLs with
/// credentials); the caller only needs enough to decide whether to retry.
fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN.replace_all(message, "${1}=***").to_string();

    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let max_content_len = 500 - truncate_suffix.len();
        sanitized = format!("{}{}", &sanitized[..max_content_len], truncate_suffix);
    }

    sanitized
}

/// Result type for triage operations
pub type TriageResult<T> = Result<T, TriageError>;
