//! Agent catalog registry
//!
//! Read-only, load-time snapshot of the known agents and their capability
//! text. The catalog itself is maintained by the out-of-scope ingestion
//! pipeline; this module only loads and indexes it. Registries are cheap to
//! share read-only across sessions behind an `Arc`.

use crate::config::ConfigError;
use crate::error::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::info;

/// A named specialized responder with a capability profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub name: String,
    /// What the agent can do, as ingested free text
    #[serde(default)]
    pub capability: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Keywords describing the agent's specializations
    #[serde(default)]
    pub specialization_keywords: Vec<String>,
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (capability: {}; description: {}; keywords: {})",
            self.name,
            self.capability,
            self.description,
            self.specialization_keywords.join(", ")
        )
    }
}

/// TOML catalog file shape: a list of `[[agents]]` tables
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    agents: Vec<Agent>,
}

/// Load-time snapshot of the agent catalog, keyed by name
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    by_name: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Build a registry from an already-loaded agent list.
    ///
    /// Catalog order is preserved; a duplicate name keeps its first entry.
    pub fn new(agents: Vec<Agent>) -> Self {
        let mut deduped: Vec<Agent> = Vec::with_capacity(agents.len());
        let mut by_name = HashMap::new();

        for agent in agents {
            if by_name.contains_key(&agent.name) {
                continue;
            }
            by_name.insert(agent.name.clone(), deduped.len());
            deduped.push(agent);
        }

        Self {
            agents: deduped,
            by_name,
        }
    }

    /// Load the registry snapshot from a TOML catalog file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: CatalogFile = toml::from_str(&content)?;

        let registry = Self::new(catalog.agents);
        info!(
            agent_count = registry.len(),
            catalog = %path.display(),
            "Loaded agent catalog"
        );
        Ok(registry)
    }

    /// All agents in catalog order
    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    /// Agents matching the given names, in catalog order.
    ///
    /// Names absent from the catalog are silently omitted; the similarity
    /// index can reference documents whose owner was since re-ingested under
    /// another name, and that must not fail the whole decision.
    pub fn by_names(&self, names: &HashSet<String>) -> Vec<Agent> {
        self.agents
            .iter()
            .filter(|agent| names.contains(&agent.name))
            .cloned()
            .collect()
    }

    /// Look up a single agent, failing if absent.
    ///
    /// Used only when explicitly setting the current agent after a decision.
    pub fn by_name(&self, name: &str) -> TriageResult<Agent> {
        self.by_name
            .get(name)
            .map(|&i| self.agents[i].clone())
            .ok_or_else(|| TriageError::agent_not_found(name))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
