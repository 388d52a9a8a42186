//! Per-session routing state machine
//!
//! One engine per conversation. Each `route` call walks the stages
//! `Rewriting -> (Clarify | CapabilityCheck) -> (Decided | Searching) ->
//! Decided` to completion; the only state that survives a call is the
//! current agent and the persisted conversation log. Every oracle call is
//! framed by a [`ScratchScope`], so ephemeral balance holds on every exit
//! path.

use crate::context::{ConversationContext, Role, ScratchScope};
use crate::engine::decision::RoutingDecision;
use crate::engine::prompts;
use crate::engine::{
    CLARIFY_SENTINEL, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_SEARCH_K, INTERNET_SEARCH,
    OTHER_AGENT_SENTINEL,
};
use crate::error::{TriageError, TriageResult};
use crate::index::{SimilarityHit, SimilarityIndex};
use crate::oracle::{AgentChoice, DecisionOracle, DecisionSchema, TextReply};
use crate::registry::{Agent, AgentRegistry};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for one engine instance
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Agent the session starts on; first catalog entry when `None`
    pub initial_agent: Option<String>,
    /// Hits requested from the similarity index per search
    pub search_k: usize,
    /// Hits farther than this are discarded before arbitration
    pub distance_threshold: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_agent: None,
            search_k: DEFAULT_SEARCH_K,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

/// Session-scoped triage state machine
///
/// Owns one mutable current agent and one conversation context. Never share
/// an instance across sessions; there is no internal locking.
pub struct RoutingEngine {
    registry: Arc<AgentRegistry>,
    index: Arc<dyn SimilarityIndex>,
    oracle: Arc<dyn DecisionOracle>,
    context: ConversationContext,
    current_agent: Agent,
    search_k: usize,
    distance_threshold: f32,
}

impl RoutingEngine {
    /// Build an engine over a loaded catalog snapshot.
    ///
    /// Fails with `AgentNotFound` when the configured initial agent is not in
    /// the catalog, and with `InvalidState` on an empty catalog.
    pub fn new(
        registry: Arc<AgentRegistry>,
        index: Arc<dyn SimilarityIndex>,
        oracle: Arc<dyn DecisionOracle>,
        options: EngineOptions,
    ) -> TriageResult<Self> {
        let current_agent = match &options.initial_agent {
            Some(name) => registry.by_name(name)?,
            None => registry
                .all()
                .first()
                .cloned()
                .ok_or_else(|| TriageError::invalid_state("agent catalog is empty"))?,
        };

        Ok(Self {
            registry,
            index,
            oracle,
            context: ConversationContext::new(),
            current_agent,
            search_k: options.search_k,
            distance_threshold: options.distance_threshold,
        })
    }

    /// The agent the session is currently on
    pub fn current_agent(&self) -> &Agent {
        &self.current_agent
    }

    /// Contents of the persisted conversation log, in order
    pub fn conversation_log(&self) -> Vec<String> {
        self.context.persisted_log()
    }

    /// Read-only view of the session's conversation context
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Route one query to the most appropriate agent.
    ///
    /// A failed call leaves the current agent and the persisted log exactly
    /// as they were.
    pub async fn route(&mut self, query: &str) -> TriageResult<RoutingDecision> {
        if self.context.has_ephemeral() {
            return Err(TriageError::invalid_state(
                "conversation context has dangling ephemeral messages",
            ));
        }

        debug!(stage = "rewriting", query, "Routing query");
        let better_query = self.rewrite_or_clarify(query).await?;
        if better_query == CLARIFY_SENTINEL {
            info!(stage = "clarify", "Query too ambiguous to route");
            return Ok(RoutingDecision::clarify());
        }

        debug!(stage = "capability_check", %better_query, current = %self.current_agent.name);
        if self.current_agent_can_answer(&better_query).await? {
            info!(stage = "decided", agent = %self.current_agent.name, "Current agent keeps the query");
            let decision = RoutingDecision::stay(&self.current_agent.name, &better_query);
            self.persist_query(&better_query);
            return Ok(decision);
        }

        debug!(stage = "searching", %better_query);
        self.search_and_arbitrate(better_query).await
    }

    /// Frame one oracle call with an ephemeral system+human pair.
    ///
    /// The scope drops before the result propagates, so the pair is removed
    /// on the failure path too.
    async fn invoke_oracle(
        &mut self,
        instruction: String,
        query: &str,
        schema: &DecisionSchema,
    ) -> TriageResult<Value> {
        let oracle = Arc::clone(&self.oracle);
        let result = {
            let scope = ScratchScope::push(&mut self.context, instruction, query);
            oracle.invoke(&scope.oracle_view(), schema).await
        };
        result.map_err(TriageError::from)
    }

    /// Rewriting stage: normalize the query or reject it with the clarify
    /// sentinel
    async fn rewrite_or_clarify(&mut self, query: &str) -> TriageResult<String> {
        let schema = DecisionSchema::text_reply();
        let instruction = prompts::rewrite_instruction(query);
        let reply = self.invoke_oracle(instruction, query, &schema).await?;

        schema
            .validate(&reply)
            .map_err(TriageError::oracle_malformed)?;
        let parsed: TextReply = serde_json::from_value(reply)
            .map_err(|e| TriageError::oracle_malformed(format!("rewrite reply: {e}")))?;

        Ok(parsed.text)
    }

    /// CapabilityCheck stage.
    ///
    /// Fail-open: anything other than an exact current-agent answer (the
    /// switch sentinel, an unknown name, a malformed shape) counts as
    /// "cannot answer" and advances to the search.
    async fn current_agent_can_answer(&mut self, better_query: &str) -> TriageResult<bool> {
        let allowed = vec![
            self.current_agent.name.clone(),
            OTHER_AGENT_SENTINEL.to_string(),
        ];
        let schema = DecisionSchema::agent_choice(&allowed);
        let instruction = prompts::capability_instruction(&self.current_agent, self.registry.all());
        let reply = self.invoke_oracle(instruction, better_query, &schema).await?;

        if let Err(violation) = schema.validate(&reply) {
            warn!(%violation, "Capability check reply out of enum, treating as cannot-answer");
            return Ok(false);
        }

        Ok(reply.get("agent").and_then(Value::as_str) == Some(self.current_agent.name.as_str()))
    }

    /// Searching stage: narrow candidates via the index, then let the oracle
    /// arbitrate
    async fn search_and_arbitrate(&mut self, better_query: String) -> TriageResult<RoutingDecision> {
        let hits = self
            .index
            .search_agents(&better_query, self.search_k)
            .await
            .map_err(TriageError::from)?;

        let surviving: Vec<SimilarityHit> = hits
            .into_iter()
            .filter(|hit| hit.distance <= self.distance_threshold)
            .collect();
        debug!(
            surviving = surviving.len(),
            threshold = self.distance_threshold,
            "Applied distance threshold"
        );

        let owners: HashSet<String> = surviving
            .iter()
            .map(|hit| hit.owning_agent.clone())
            .collect();
        let candidates = self.registry.by_names(&owners);

        // Owners the catalog no longer knows are dropped by the lossy lookup;
        // with nothing left to arbitrate the turn degrades to the no-hit path
        if candidates.is_empty() {
            return self.fallback_decision(better_query).await;
        }

        let mut allowed: Vec<String> = candidates.iter().map(|a| a.name.clone()).collect();
        if !allowed.contains(&self.current_agent.name) {
            allowed.push(self.current_agent.name.clone());
        }

        let schema = DecisionSchema::agent_choice(&allowed);
        let instruction = prompts::arbitration_instruction(&candidates);
        let reply = self
            .invoke_oracle(instruction, &better_query, &schema)
            .await?;
        let chosen = Self::validated_choice(&schema, reply)?;

        let chosen_agent = self.registry.by_name(&chosen)?;
        let other_agents: Vec<String> = candidates
            .iter()
            .filter(|a| a.name != chosen)
            .map(|a| a.name.clone())
            .collect();
        let top_documents: Vec<String> = surviving
            .iter()
            .map(|hit| hit.document_id.clone())
            .collect();

        info!(
            stage = "decided",
            agent = %chosen,
            candidates = allowed.len(),
            documents = top_documents.len(),
            "Arbitration complete"
        );
        self.current_agent = chosen_agent;
        self.persist_query(&better_query);

        Ok(RoutingDecision {
            relevant_agent: Some(chosen),
            other_agents,
            switched: true,
            clarify: false,
            query_used: Some(better_query),
            top_documents,
        })
    }

    /// No surviving candidates: binary choice between the current agent and
    /// the internet-search fallback
    async fn fallback_decision(&mut self, better_query: String) -> TriageResult<RoutingDecision> {
        let mut allowed = vec![self.current_agent.name.clone()];
        if self.current_agent.name != INTERNET_SEARCH {
            allowed.push(INTERNET_SEARCH.to_string());
        }

        let schema = DecisionSchema::agent_choice(&allowed);
        let instruction = prompts::no_candidates_instruction(&self.current_agent.name);
        let reply = self
            .invoke_oracle(instruction, &better_query, &schema)
            .await?;
        let chosen = Self::validated_choice(&schema, reply)?;

        let chosen_agent = self.registry.by_name(&chosen)?;
        info!(stage = "decided", agent = %chosen, "No candidates survived, fallback choice made");
        self.current_agent = chosen_agent;
        self.persist_query(&better_query);

        Ok(RoutingDecision {
            relevant_agent: Some(chosen),
            other_agents: Vec::new(),
            switched: true,
            clarify: false,
            query_used: Some(better_query),
            top_documents: Vec::new(),
        })
    }

    /// Boundary validation for the selection call sites: an out-of-enum reply
    /// is a malformed response, never a silent default
    fn validated_choice(schema: &DecisionSchema, reply: Value) -> TriageResult<String> {
        schema
            .validate(&reply)
            .map_err(TriageError::oracle_malformed)?;
        let parsed: AgentChoice = serde_json::from_value(reply)
            .map_err(|e| TriageError::oracle_malformed(format!("selection reply: {e}")))?;
        Ok(parsed.agent)
    }

    fn persist_query(&mut self, better_query: &str) {
        self.context.append(Role::Human, better_query, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{MockDecisionOracle, MockSimilarityIndex};
    use serde_json::json;

    fn registry() -> Arc<AgentRegistry> {
        Arc::new(AgentRegistry::new(vec![
            Agent {
                name: "internet_search".to_string(),
                capability: "general web search".to_string(),
                description: "fallback".to_string(),
                specialization_keywords: vec![],
            },
            Agent {
                name: "hr_policies".to_string(),
                capability: "answers HR policy questions".to_string(),
                description: "HR specialist".to_string(),
                specialization_keywords: vec!["leave".to_string()],
            },
        ]))
    }

    fn engine_with(
        oracle: MockDecisionOracle,
        index: MockSimilarityIndex,
        initial: &str,
    ) -> RoutingEngine {
        RoutingEngine::new(
            registry(),
            Arc::new(index),
            Arc::new(oracle),
            EngineOptions {
                initial_agent: Some(initial.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_defaults_to_first_catalog_agent() {
        let engine = RoutingEngine::new(
            registry(),
            Arc::new(MockSimilarityIndex::empty()),
            Arc::new(MockDecisionOracle::new(vec![])),
            EngineOptions::default(),
        )
        .unwrap();

        assert_eq!(engine.current_agent().name, "internet_search");
    }

    #[test]
    fn test_new_unknown_initial_agent_fails() {
        let result = RoutingEngine::new(
            registry(),
            Arc::new(MockSimilarityIndex::empty()),
            Arc::new(MockDecisionOracle::new(vec![])),
            EngineOptions {
                initial_agent: Some("ghost".to_string()),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(TriageError::AgentNotFound { .. })));
    }

    #[test]
    fn test_new_empty_catalog_fails() {
        let result = RoutingEngine::new(
            Arc::new(AgentRegistry::new(vec![])),
            Arc::new(MockSimilarityIndex::empty()),
            Arc::new(MockDecisionOracle::new(vec![])),
            EngineOptions::default(),
        );

        assert!(matches!(result, Err(TriageError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_clarify_short_circuits_without_mutation() {
        let oracle = MockDecisionOracle::new(vec![json!({"text": "$CLARIFY"})]);
        let mut engine = engine_with(oracle, MockSimilarityIndex::empty(), "hr_policies");

        let decision = engine.route("Hello").await.unwrap();

        assert!(decision.is_clarify());
        assert_eq!(engine.current_agent().name, "hr_policies");
        assert!(engine.conversation_log().is_empty());
    }

    #[tokio::test]
    async fn test_capability_check_keeps_current_agent() {
        let oracle = MockDecisionOracle::new(vec![
            json!({"text": "leave policy details"}),
            json!({"agent": "hr_policies"}),
        ]);
        let mut engine = engine_with(oracle, MockSimilarityIndex::empty(), "hr_policies");

        let decision = engine.route("what is the leave policy?").await.unwrap();

        assert!(!decision.switched);
        assert_eq!(decision.relevant_agent.as_deref(), Some("hr_policies"));
        assert_eq!(decision.query_used.as_deref(), Some("leave policy details"));
        assert_eq!(engine.conversation_log(), vec!["leave policy details"]);
    }

    #[tokio::test]
    async fn test_oracle_failure_leaves_state_untouched() {
        let oracle = MockDecisionOracle::with_failure();
        let mut engine = engine_with(oracle, MockSimilarityIndex::empty(), "hr_policies");

        let result = engine.route("what is the leave policy?").await;

        assert!(matches!(result, Err(TriageError::OracleUnavailable { .. })));
        assert_eq!(engine.current_agent().name, "hr_policies");
        assert!(engine.conversation_log().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rewrite_reply_is_an_error() {
        let oracle = MockDecisionOracle::new(vec![json!({"wrong": "shape"})]);
        let mut engine = engine_with(oracle, MockSimilarityIndex::empty(), "hr_policies");

        let result = engine.route("anything").await;
        assert!(matches!(
            result,
            Err(TriageError::OracleMalformedResponse { .. })
        ));
        assert!(engine.conversation_log().is_empty());
    }
}
