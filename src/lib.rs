//! Agent Triage - conversational query routing
//!
//! Routes a user's natural-language query, within a multi-turn conversation,
//! to the most appropriate of several specialized agents, each backed by a
//! distinct knowledge domain.
//!
//! # Overview
//!
//! The crate provides:
//! - A per-session [`engine::RoutingEngine`] that normalizes or rejects
//!   ambiguous queries, checks whether the active agent can answer, and
//!   arbitrates among candidates surfaced by a semantic index
//! - A [`service::TriageService`] keying one engine per session
//! - Adapters for the two external collaborators: an OpenAI-compatible
//!   decision oracle and a REST similarity index
//! - A TOML-backed agent catalog registry and configuration system
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use agent_triage::engine::{EngineOptions, RoutingEngine};
//! use agent_triage::testing::mocks::{catalog_with, MockDecisionOracle, MockSimilarityIndex};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), agent_triage::TriageError> {
//! let registry = Arc::new(catalog_with(&[("hr_policies", "answers HR policy questions")]));
//! let oracle = Arc::new(MockDecisionOracle::new(vec![
//!     json!({"text": "annual leave policy"}),
//!     json!({"agent": "hr_policies"}),
//! ]));
//!
//! let mut engine = RoutingEngine::new(
//!     registry,
//!     Arc::new(MockSimilarityIndex::empty()),
//!     oracle,
//!     EngineOptions {
//!         initial_agent: Some("hr_policies".to_string()),
//!         ..Default::default()
//!     },
//! )?;
//!
//! let decision = engine.route("what is the leave policy?").await?;
//! assert_eq!(decision.relevant_agent.as_deref(), Some("hr_policies"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod index;
pub mod observability;
pub mod oracle;
pub mod registry;
pub mod service;
pub mod testing;

pub use config::TriageConfig;
pub use engine::{EngineOptions, RoutingDecision, RoutingEngine};
pub use error::{TriageError, TriageResult};
pub use index::{SimilarityHit, SimilarityIndex};
pub use oracle::DecisionOracle;
pub use registry::{Agent, AgentRegistry};
pub use service::TriageService;
