//! HTTP similarity index adapter
//!
//! Queries a REST vector-index backend that exposes a columnar query
//! endpoint: `POST {base}/collections/{name}/query` with `query_texts` and
//! `n_results`, answering parallel arrays of ids, documents, metadatas, and
//! distances. Each metadata object carries the owning agent under
//! `agent_name`.

use crate::index::{IndexError, SimilarityHit, SimilarityIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for the HTTP index backend
#[derive(Debug, Clone)]
pub struct HttpSimilarityIndexConfig {
    pub base_url: String,
    pub collection: String,
    pub timeout: Duration,
}

impl Default for HttpSimilarityIndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            collection: "agents".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Similarity index backed by a REST vector store
pub struct HttpSimilarityIndex {
    config: HttpSimilarityIndexConfig,
    client: Client,
}

impl HttpSimilarityIndex {
    pub fn new(config: HttpSimilarityIndexConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Flatten the backend's columnar reply into hits, preserving rank order.
    ///
    /// Rows with no parseable owner metadata are dropped rather than failing
    /// the search.
    fn convert_response(response: WireQueryResponse) -> Vec<SimilarityHit> {
        let ids = response.ids.into_iter().flatten();
        let documents = response.documents.into_iter().flatten();
        let metadatas = response.metadatas.into_iter().flatten();
        let distances = response.distances.into_iter().flatten();

        ids.zip(documents)
            .zip(metadatas.zip(distances))
            .filter_map(|((id, document), (metadata, distance))| {
                let owning_agent = match metadata.and_then(|m| m.agent_name) {
                    Some(name) => name,
                    None => {
                        warn!(document_id = %id, "Index hit has no owning agent, dropping");
                        return None;
                    }
                };
                Some(SimilarityHit {
                    document_id: id,
                    owning_agent,
                    distance,
                    content: document.unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SimilarityIndex for HttpSimilarityIndex {
    fn name(&self) -> &str {
        "http"
    }

    async fn search_agents(&self, text: &str, k: usize) -> Result<Vec<SimilarityHit>, IndexError> {
        let url = format!(
            "{}/collections/{}/query",
            self.config.base_url, self.config.collection
        );
        let request = WireQueryRequest {
            query_texts: vec![text.to_string()],
            n_results: k,
            include: vec![
                "documents".to_string(),
                "metadatas".to_string(),
                "distances".to_string(),
            ],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::Unavailable(format!("HTTP request failed: {e}")))?;

        // A missing collection means nothing was ingested yet, which is a
        // normal startup state
        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = %self.config.collection, "Index collection absent, returning no hits");
            return Ok(Vec::new());
        }

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(IndexError::Unavailable(format!(
                "index backend error: {status} - {error_text}"
            )));
        }

        let wire: WireQueryResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        let hits = Self::convert_response(wire);
        debug!(query = %text, k, hit_count = hits.len(), "Similarity search complete");
        Ok(hits)
    }
}

#[derive(Debug, Serialize)]
struct WireQueryRequest {
    query_texts: Vec<String>,
    n_results: usize,
    include: Vec<String>,
}

/// Columnar reply: outer vector is one entry per query text
#[derive(Debug, Default, Deserialize)]
struct WireQueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<WireMetadata>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct WireMetadata {
    #[serde(default)]
    agent_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_response() -> WireQueryResponse {
        WireQueryResponse {
            ids: vec![vec!["d1".to_string(), "d2".to_string()]],
            documents: vec![vec![Some("text one".to_string()), None]],
            metadatas: vec![vec![
                Some(WireMetadata {
                    agent_name: Some("alpha".to_string()),
                }),
                Some(WireMetadata {
                    agent_name: Some("beta".to_string()),
                }),
            ]],
            distances: vec![vec![0.3, 1.2]],
        }
    }

    #[test]
    fn test_convert_response_preserves_rank_order() {
        let hits = HttpSimilarityIndex::convert_response(wire_response());

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, "d1");
        assert_eq!(hits[0].owning_agent, "alpha");
        assert_eq!(hits[0].distance, 0.3);
        assert_eq!(hits[0].content, "text one");
        assert_eq!(hits[1].document_id, "d2");
        assert!(hits[1].content.is_empty());
    }

    #[test]
    fn test_convert_response_drops_ownerless_rows() {
        let mut wire = wire_response();
        wire.metadatas = vec![vec![None, Some(WireMetadata { agent_name: None })]];

        let hits = HttpSimilarityIndex::convert_response(wire);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_convert_empty_response() {
        let hits = HttpSimilarityIndex::convert_response(WireQueryResponse::default());
        assert!(hits.is_empty());
    }
}
