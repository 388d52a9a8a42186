//! Oracle prompt construction
//!
//! One builder per oracle call site. Each instruction frames exactly one
//! decision and is pushed as an ephemeral system message, so nothing here
//! ever reaches the persisted log.

use crate::engine::{CLARIFY_SENTINEL, INTERNET_SEARCH, OTHER_AGENT_SENTINEL};
use crate::registry::Agent;

fn render_agents(agents: &[Agent]) -> String {
    agents
        .iter()
        .map(Agent::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rewrite/clarify instruction for the first oracle call of a turn
pub fn rewrite_instruction(query: &str) -> String {
    format!(
        r#"Rewrite the user query into a form that performs well against a retrieval index, or ask for clarification.
A query that is a sensible sentence or carries meaningful keywords is okay: rewrite it and return the rewritten text.
A query with no routable intent (smalltalk like "Hello" or "How are you", or something too vague for a retrieval model to work with) cannot be routed: return exactly {clarify}.
Rewrite the query instead of answering it, and never return an empty or one-word response unless it is {clarify}.
The user query is: {query}"#,
        clarify = CLARIFY_SENTINEL,
        query = query
    )
}

/// Instruction asking whether the current agent can keep the question
pub fn capability_instruction(current: &Agent, all_agents: &[Agent]) -> String {
    format!(
        r#"Determine whether the current agent can answer the question or it must be redirected to another agent.
The current agent is {current}.
For context only, the known agents are: {agents} - DO NOT USE THESE NAMES IN THE RESPONSE.
A specialized current agent should usually keep the question; {internet_search} is rarely the right home for a question when specialized agents exist.
ONLY ANSWER WITH THE CURRENT AGENT NAME OR {other}. Be strict about whether the current agent can really answer; it is okay to switch when in doubt."#,
        current = current,
        agents = render_agents(all_agents),
        internet_search = INTERNET_SEARCH,
        other = OTHER_AGENT_SENTINEL
    )
}

/// Fallback instruction when no similarity candidate survived
pub fn no_candidates_instruction(current_name: &str) -> String {
    format!(
        r#"No relevant agents were found for the query. The current agent is {current}.
{internet_search} is usually preferred when nothing relevant was found, but keep the current agent if it has any capability to answer the question.
ONLY CHOOSE BETWEEN THE CURRENT AGENT AND {internet_search}. DO NOT CHOOSE ANY OTHER AGENT."#,
        current = current_name,
        internet_search = INTERNET_SEARCH
    )
}

/// Arbitration instruction over the surviving candidate set
pub fn arbitration_instruction(candidates: &[Agent]) -> String {
    format!(
        r#"Determine the most relevant agent based on the conversation history. If the current agent is capable of answering the question, keep the current agent.
The specialized candidate agents are: {candidates}.
You can use earlier messages as context, but THE NEWEST HUMAN MESSAGE IS THE MOST IMPORTANT when deciding.
ONLY CHOOSE FROM THESE AGENTS. DO NOT CHOOSE ANY OTHER AGENT."#,
        candidates = render_agents(candidates)
    )
}
