//! Similarity index abstraction
//!
//! The index holds embedded agent capability documents and answers free-text
//! queries with ranked hits. It only narrows the candidate set and supplies
//! grounding context; it never picks an agent unilaterally. Threshold
//! filtering is the engine's policy, not the index's, which keeps this
//! contract backend-agnostic.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{HttpSimilarityIndex, HttpSimilarityIndexConfig};

/// A ranked match from the semantic index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
    /// Backend identifier of the matched document
    pub document_id: String,
    /// Agent that owns the matched capability document
    pub owning_agent: String,
    /// Lower is more similar
    pub distance: f32,
    /// Matched document text
    pub content: String,
}

/// Index adapter errors, converted to [`crate::error::TriageError`] at the
/// engine boundary
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Index backend failed: {0}")]
    Unavailable(String),
    #[error("Index backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<IndexError> for crate::error::TriageError {
    fn from(e: IndexError) -> Self {
        crate::error::TriageError::index_unavailable(e.to_string())
    }
}

/// Semantic search over agent capability documents
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Adapter name (e.g. "http", "mock")
    fn name(&self) -> &str;

    /// Return up to `k` hits for the query text, ordered by ascending
    /// distance.
    ///
    /// An empty or absent backing index is a normal startup state and yields
    /// an empty vector, not an error.
    async fn search_agents(&self, text: &str, k: usize) -> Result<Vec<SimilarityHit>, IndexError>;
}
