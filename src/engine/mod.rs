//! Routing engine
//!
//! The core of the crate: a per-session state machine that sequences the
//! decision oracle and the similarity index into a routing decision. The
//! oracle's answer is the sole source of truth for agent selection; the
//! similarity search only narrows the candidate set and supplies grounding
//! context.

pub mod decision;
pub mod prompts;
pub mod routing;

pub use decision::RoutingDecision;
pub use routing::{EngineOptions, RoutingEngine};

/// Sentinel the rewrite step returns for queries too ambiguous to route
pub const CLARIFY_SENTINEL: &str = "$CLARIFY";

/// Sentinel the capability check returns to mean "cannot answer, switch"
pub const OTHER_AGENT_SENTINEL: &str = "$OTHER_AGENT";

/// Name of the catalog's general-web fallback agent
pub const INTERNET_SEARCH: &str = "internet_search";

/// Default number of hits requested per similarity search
pub const DEFAULT_SEARCH_K: usize = 3;

/// Default distance cutoff; hits farther than this never influence agent
/// choice
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 1.5;
