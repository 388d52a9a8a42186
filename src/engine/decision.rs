//! Routing decision value object
//!
//! The decision returned to the caller after one `route` call. The engine
//! does not retain it; the only state that outlives a call is the current
//! agent and the persisted conversation log.

use serde::{Deserialize, Serialize};

/// Outcome of routing one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Chosen agent; `None` only when clarification is requested
    pub relevant_agent: Option<String>,
    /// Search candidates considered but not chosen
    pub other_agents: Vec<String>,
    /// Whether the Searching branch decided this turn
    pub switched: bool,
    /// Whether the query was rejected as too ambiguous to route
    pub clarify: bool,
    /// The possibly-rewritten query the decision was made on
    pub query_used: Option<String>,
    /// Identifiers of the surviving similarity hits, in index rank order
    pub top_documents: Vec<String>,
}

impl RoutingDecision {
    /// The query was too ambiguous to route; the caller should ask the user
    /// to rephrase
    pub fn clarify() -> Self {
        Self {
            relevant_agent: None,
            other_agents: Vec::new(),
            switched: false,
            clarify: true,
            query_used: None,
            top_documents: Vec::new(),
        }
    }

    /// The current agent keeps the conversation
    pub fn stay(agent: impl Into<String>, query_used: impl Into<String>) -> Self {
        Self {
            relevant_agent: Some(agent.into()),
            other_agents: Vec::new(),
            switched: false,
            clarify: false,
            query_used: Some(query_used.into()),
            top_documents: Vec::new(),
        }
    }

    pub fn is_clarify(&self) -> bool {
        self.clarify
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clarify_decision_shape() {
        let decision = RoutingDecision::clarify();

        assert!(decision.is_clarify());
        assert!(decision.relevant_agent.is_none());
        assert!(decision.other_agents.is_empty());
        assert!(!decision.switched);
        assert!(decision.query_used.is_none());
        assert!(decision.top_documents.is_empty());
    }

    #[test]
    fn test_stay_decision_shape() {
        let decision = RoutingDecision::stay("hr_policies", "what is the leave policy?");

        assert!(!decision.is_clarify());
        assert!(!decision.switched);
        assert_eq!(decision.relevant_agent.as_deref(), Some("hr_policies"));
        assert_eq!(
            decision.query_used.as_deref(),
            Some("what is the leave policy?")
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let decision = RoutingDecision {
            relevant_agent: Some("alpha".to_string()),
            other_agents: vec!["beta".to_string()],
            switched: true,
            clarify: false,
            query_used: Some("refined".to_string()),
            top_documents: vec!["d1".to_string(), "d2".to_string()],
        };

        let json = serde_json::to_string(&decision).unwrap();
        let parsed: RoutingDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decision);
    }
}
