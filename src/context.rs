//! Per-session conversation log with ephemeral-message discipline
//!
//! The decision oracle consumes the entire context as conversational
//! grounding, so scratch instructions framing a single oracle call must never
//! leak into the durable log. [`ConversationContext`] keeps the ordered
//! message sequence; [`ScratchScope`] owns one ephemeral system+human pair and
//! removes it on drop, which keeps the balance invariant on every exit path,
//! early `?` returns included.

use crate::oracle::{ChatMessage, ChatRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
}

/// A single conversation entry
///
/// Persisted messages form the durable conversation log; ephemeral ones exist
/// only for the duration of a single oracle call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub persisted: bool,
    pub created_at: DateTime<Utc>,
}

/// Ordered log of real and scratch messages for one session
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the tail of the log
    pub fn append(&mut self, role: Role, content: impl Into<String>, persisted: bool) {
        self.messages.push(Message {
            role,
            content: content.into(),
            persisted,
            created_at: Utc::now(),
        });
    }

    /// Remove the most recently appended ephemeral message of the given role,
    /// scanning from the tail. No-op returning `false` if none exists.
    pub fn remove_last_ephemeral(&mut self, role: Role) -> bool {
        for i in (0..self.messages.len()).rev() {
            if self.messages[i].role == role && !self.messages[i].persisted {
                self.messages.remove(i);
                return true;
            }
        }
        false
    }

    /// Full message sequence, scratch entries included
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Contents of the persisted messages, in order
    pub fn persisted_log(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.persisted)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Number of persisted messages
    pub fn persisted_len(&self) -> usize {
        self.messages.iter().filter(|m| m.persisted).count()
    }

    /// True if any scratch entry is still present
    pub fn has_ephemeral(&self) -> bool {
        self.messages.iter().any(|m| !m.persisted)
    }

    /// Render the full context (persisted prefix plus any live scratch pair)
    /// in the shape the oracle consumes
    pub fn oracle_view(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::System => ChatRole::System,
                    Role::Human => ChatRole::Human,
                },
                content: m.content.clone(),
            })
            .collect()
    }
}

/// RAII guard owning one ephemeral system+human pair.
///
/// Construction appends the pair; drop removes it in LIFO order. While the
/// scope is alive, [`ScratchScope::oracle_view`] yields the context exactly as
/// one oracle call should see it.
pub struct ScratchScope<'a> {
    context: &'a mut ConversationContext,
}

impl<'a> ScratchScope<'a> {
    /// Push an ephemeral instruction and query pair onto the context
    pub fn push(
        context: &'a mut ConversationContext,
        instruction: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        context.append(Role::System, instruction, false);
        context.append(Role::Human, query, false);
        Self { context }
    }

    /// The context as the oracle should see it for this call
    pub fn oracle_view(&self) -> Vec<ChatMessage> {
        self.context.oracle_view()
    }
}

impl Drop for ScratchScope<'_> {
    fn drop(&mut self) {
        // LIFO: the human message was appended last
        self.context.remove_last_ephemeral(Role::Human);
        self.context.remove_last_ephemeral(Role::System);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_persisted_log() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::Human, "first question", true);
        ctx.append(Role::System, "scratch instruction", false);
        ctx.append(Role::Human, "second question", true);

        assert_eq!(ctx.persisted_log(), vec!["first question", "second question"]);
        assert_eq!(ctx.persisted_len(), 2);
        assert!(ctx.has_ephemeral());
    }

    #[test]
    fn test_remove_last_ephemeral_scans_from_tail() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::System, "older scratch", false);
        ctx.append(Role::Human, "durable", true);
        ctx.append(Role::System, "newer scratch", false);

        assert!(ctx.remove_last_ephemeral(Role::System));
        let contents: Vec<_> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["older scratch", "durable"]);
    }

    #[test]
    fn test_remove_last_ephemeral_skips_persisted() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::Human, "durable", true);

        // Only the ephemeral flag qualifies a message for removal
        assert!(!ctx.remove_last_ephemeral(Role::Human));
        assert_eq!(ctx.persisted_len(), 1);
    }

    #[test]
    fn test_remove_last_ephemeral_empty_is_noop() {
        let mut ctx = ConversationContext::new();
        assert!(!ctx.remove_last_ephemeral(Role::System));
        assert!(!ctx.remove_last_ephemeral(Role::Human));
    }

    #[test]
    fn test_scratch_scope_balances_on_drop() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::Human, "earlier turn", true);

        {
            let scope = ScratchScope::push(&mut ctx, "do the rewrite", "what is X?");
            let view = scope.oracle_view();
            assert_eq!(view.len(), 3);
            assert_eq!(view[1].content, "do the rewrite");
            assert_eq!(view[2].content, "what is X?");
        }

        assert!(!ctx.has_ephemeral());
        assert_eq!(ctx.persisted_log(), vec!["earlier turn"]);
    }

    #[test]
    fn test_scratch_scope_balances_on_early_return() {
        fn fallible(ctx: &mut ConversationContext) -> Result<(), &'static str> {
            let _scope = ScratchScope::push(ctx, "instruction", "query");
            Err("oracle failed")
        }

        let mut ctx = ConversationContext::new();
        assert!(fallible(&mut ctx).is_err());
        assert!(!ctx.has_ephemeral());
    }

    #[test]
    fn test_scope_removal_is_lifo_around_older_scratch() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::System, "outer", false);

        {
            let scope = ScratchScope::push(&mut ctx, "inner sys", "inner human");
            assert_eq!(scope.oracle_view().len(), 3);
        }

        // Inner pair removed; the older scratch entry survives untouched
        let contents: Vec<_> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["outer"]);
    }

    #[test]
    fn test_oracle_view_maps_roles() {
        let mut ctx = ConversationContext::new();
        ctx.append(Role::System, "sys", false);
        ctx.append(Role::Human, "hum", true);

        let view = ctx.oracle_view();
        assert!(matches!(view[0].role, ChatRole::System));
        assert!(matches!(view[1].role, ChatRole::Human));
    }
}
