//! Session-keyed triage service
//!
//! One routing engine per conversation, behind per-key exclusive access.
//! `current_agent` and the message log are session-scoped mutable state, so
//! an engine is never shared across sessions; the registry, index, and oracle
//! are read-mostly and shared by all of them.

use crate::engine::{EngineOptions, RoutingDecision, RoutingEngine};
use crate::error::TriageResult;
use crate::index::SimilarityIndex;
use crate::oracle::DecisionOracle;
use crate::registry::AgentRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Caller-facing routing service keyed by session identifier
pub struct TriageService {
    registry: Arc<AgentRegistry>,
    index: Arc<dyn SimilarityIndex>,
    oracle: Arc<dyn DecisionOracle>,
    options: EngineOptions,
    sessions: Mutex<HashMap<String, Arc<Mutex<RoutingEngine>>>>,
}

impl TriageService {
    pub fn new(
        registry: Arc<AgentRegistry>,
        index: Arc<dyn SimilarityIndex>,
        oracle: Arc<dyn DecisionOracle>,
        options: EngineOptions,
    ) -> Self {
        Self {
            registry,
            index,
            oracle,
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Route one query within the given session.
    ///
    /// The session's engine is created lazily on first use. Decisions within
    /// a session are strictly sequential: the per-session lock is held for
    /// the whole call, and each decision sees the persisted effects of all
    /// prior decisions in that session and of no other session.
    pub async fn route(&self, session_id: &str, query: &str) -> TriageResult<RoutingDecision> {
        let engine = self.session_engine(session_id).await?;
        let mut engine = engine.lock().await;
        engine.route(query).await
    }

    /// Persisted conversation log for a session; empty for unknown sessions
    pub async fn conversation_log(&self, session_id: &str) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(engine) => engine.lock().await.conversation_log(),
            None => Vec::new(),
        }
    }

    /// Name of the agent a session is currently on, if the session exists
    pub async fn current_agent(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(engine) => Some(engine.lock().await.current_agent().name.clone()),
            None => None,
        }
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Look up or lazily create the session's engine.
    ///
    /// The map lock is released before the engine itself is locked, so a slow
    /// decision in one session never blocks another session's lookup.
    async fn session_engine(&self, session_id: &str) -> TriageResult<Arc<Mutex<RoutingEngine>>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(engine) = sessions.get(session_id) {
            return Ok(Arc::clone(engine));
        }

        let engine = RoutingEngine::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.index),
            Arc::clone(&self.oracle),
            self.options.clone(),
        )?;
        info!(session_id, "Created routing engine for new session");

        let engine = Arc::new(Mutex::new(engine));
        sessions.insert(session_id.to_string(), Arc::clone(&engine));
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{catalog_with, MockDecisionOracle, MockSimilarityIndex};
    use serde_json::json;

    fn service(oracle: MockDecisionOracle) -> TriageService {
        TriageService::new(
            Arc::new(catalog_with(&[("hr_policies", "answers HR questions")])),
            Arc::new(MockSimilarityIndex::empty()),
            Arc::new(oracle),
            EngineOptions {
                initial_agent: Some("hr_policies".to_string()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_sessions_created_lazily() {
        let oracle = MockDecisionOracle::new(vec![
            json!({"text": "refined"}),
            json!({"agent": "hr_policies"}),
        ]);
        let svc = service(oracle);

        assert_eq!(svc.session_count().await, 0);
        svc.route("s1", "question about leave").await.unwrap();
        assert_eq!(svc.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_has_empty_log_and_no_agent() {
        let svc = service(MockDecisionOracle::new(vec![]));
        assert!(svc.conversation_log("nope").await.is_empty());
        assert!(svc.current_agent("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let oracle = MockDecisionOracle::new(vec![
            json!({"text": "refined one"}),
            json!({"agent": "hr_policies"}),
            json!({"text": "refined two"}),
            json!({"agent": "hr_policies"}),
        ]);
        let svc = service(oracle);

        svc.route("s1", "first session question").await.unwrap();
        svc.route("s2", "second session question").await.unwrap();

        assert_eq!(svc.conversation_log("s1").await, vec!["refined one"]);
        assert_eq!(svc.conversation_log("s2").await, vec!["refined two"]);
        assert_eq!(svc.session_count().await, 2);
    }
}
