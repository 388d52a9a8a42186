//! Mock implementations for testing
//!
//! Provides mock DecisionOracle and SimilarityIndex implementations plus a
//! small catalog builder. The mock oracle records every invocation so tests
//! can assert on the exact conversation and schema each call site produced.

use crate::index::{IndexError, SimilarityHit, SimilarityIndex};
use crate::oracle::{ChatMessage, DecisionOracle, DecisionSchema, OracleError};
use crate::registry::{Agent, AgentRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One recorded oracle call: the conversation it saw and the schema it was
/// constrained by
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    pub messages: Vec<ChatMessage>,
    pub schema: DecisionSchema,
}

/// Mock decision oracle replaying scripted JSON replies
#[derive(Debug, Default)]
pub struct MockDecisionOracle {
    replies: Vec<Value>,
    schema_replies: HashMap<String, Value>,
    cursor: Arc<Mutex<usize>>,
    invocations: Arc<Mutex<Vec<RecordedInvocation>>>,
    should_fail: bool,
}

impl MockDecisionOracle {
    /// Oracle that replays the given replies in order, cycling when exhausted
    pub fn new(replies: Vec<Value>) -> Self {
        Self {
            replies,
            ..Default::default()
        }
    }

    /// Oracle answering by schema name instead of call order.
    ///
    /// Deterministic under interleaved sessions, where call order is not.
    pub fn by_schema(schema_replies: HashMap<String, Value>) -> Self {
        Self {
            schema_replies,
            ..Default::default()
        }
    }

    /// Oracle whose every invocation fails with a transport error
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Everything the engine asked this oracle, in order
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of invocations so far
    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl DecisionOracle for MockDecisionOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        schema: &DecisionSchema,
    ) -> Result<Value, OracleError> {
        self.invocations.lock().unwrap().push(RecordedInvocation {
            messages: messages.to_vec(),
            schema: schema.clone(),
        });

        if self.should_fail {
            return Err(OracleError::Unavailable("mock oracle failure".to_string()));
        }

        if !self.schema_replies.is_empty() {
            return self
                .schema_replies
                .get(&schema.name)
                .cloned()
                .ok_or_else(|| {
                    OracleError::Malformed(format!("no scripted reply for schema {}", schema.name))
                });
        }

        let mut cursor = self.cursor.lock().unwrap();
        let reply_idx = *cursor % self.replies.len().max(1);
        *cursor += 1;

        match self.replies.get(reply_idx) {
            Some(reply) => Ok(reply.clone()),
            None => Err(OracleError::Malformed("mock oracle has no replies".to_string())),
        }
    }
}

/// Mock similarity index serving preloaded hits
#[derive(Debug, Default)]
pub struct MockSimilarityIndex {
    hits: Vec<SimilarityHit>,
    queries: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockSimilarityIndex {
    /// Index returning the given hits (already ordered by distance), capped
    /// at `k` per search
    pub fn new(hits: Vec<SimilarityHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// Index with nothing ingested yet
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index whose every search fails with a backend error
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Every query text this index was searched with
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilarityIndex for MockSimilarityIndex {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_agents(&self, text: &str, k: usize) -> Result<Vec<SimilarityHit>, IndexError> {
        self.queries.lock().unwrap().push(text.to_string());

        if self.should_fail {
            return Err(IndexError::Unavailable("mock index failure".to_string()));
        }

        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

/// Convenience hit constructor for tests
pub fn hit(document_id: &str, owning_agent: &str, distance: f32) -> SimilarityHit {
    SimilarityHit {
        document_id: document_id.to_string(),
        owning_agent: owning_agent.to_string(),
        distance,
        content: format!("capability text owned by {owning_agent}"),
    }
}

/// Convenience agent constructor for tests
pub fn agent(name: &str, capability: &str) -> Agent {
    Agent {
        name: name.to_string(),
        capability: capability.to_string(),
        description: format!("{name} specialist"),
        specialization_keywords: Vec::new(),
    }
}

/// A small catalog with the fallback agent plus the given specialists
pub fn catalog_with(specialists: &[(&str, &str)]) -> AgentRegistry {
    let mut agents = vec![agent("internet_search", "general web search")];
    agents.extend(
        specialists
            .iter()
            .map(|(name, capability)| agent(name, capability)),
    );
    AgentRegistry::new(agents)
}
