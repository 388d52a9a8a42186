//! Configuration system for the triage engine
//!
//! TOML-backed configuration with environment-variable resolution for
//! secrets. Sections map onto the engine's collaborators: the agent catalog,
//! the decision oracle, the similarity index, and the routing knobs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageConfig {
    pub catalog: CatalogSection,
    pub oracle: OracleSection,
    pub index: IndexSection,
    #[serde(default)]
    pub routing: RoutingSection,
}

/// Agent catalog location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSection {
    /// Path to the TOML agent catalog maintained by the ingestion pipeline
    pub path: PathBuf,
}

/// Decision oracle (LLM) connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleSection {
    /// Provider name (currently "openai" or any OpenAI-compatible endpoint)
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Sampling temperature; routing wants determinism
    #[serde(default = "default_oracle_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Similarity index backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexSection {
    /// Base URL of the vector-index query endpoint
    pub base_url: String,
    /// Collection holding agent capability documents
    #[serde(default = "default_index_collection")]
    pub collection: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Routing policy knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingSection {
    /// Agent a fresh session starts on; first catalog entry when absent
    pub default_agent: Option<String>,
    /// Number of hits requested from the similarity index
    #[serde(default = "default_search_k")]
    pub search_k: usize,
    /// Hits farther than this distance are discarded
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            default_agent: None,
            search_k: default_search_k(),
            distance_threshold: default_distance_threshold(),
        }
    }
}

fn default_oracle_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_oracle_temperature() -> f32 {
    0.0
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_index_collection() -> String {
    "agents".to_string()
}

fn default_search_k() -> usize {
    3
}

fn default_distance_threshold() -> f32 {
    1.5
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TriageConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TriageConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.oracle.base_url).map_err(|e| {
            ConfigError::InvalidConfig(format!("oracle.base_url is not a valid URL: {e}"))
        })?;
        Url::parse(&self.index.base_url).map_err(|e| {
            ConfigError::InvalidConfig(format!("index.base_url is not a valid URL: {e}"))
        })?;

        if self.routing.search_k == 0 {
            return Err(ConfigError::InvalidConfig(
                "routing.search_k must be at least 1".to_string(),
            ));
        }
        if self.routing.distance_threshold <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "routing.distance_threshold must be positive".to_string(),
            ));
        }
        if self.oracle.timeout_secs == 0 || self.index.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the oracle API key from the configured environment variable
    pub fn oracle_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.oracle.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.oracle.api_key_env.clone()))
    }
}
