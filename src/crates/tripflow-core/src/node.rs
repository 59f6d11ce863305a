//! The node contract.
//!
//! A node is one state-transformation step in an agent graph. The interface
//! is deliberately explicit: a fixed async function signature over the typed
//! [`ConversationState`], with capabilities (LLM client, search client, ...)
//! injected into the implementing struct at construction - never discovered
//! reflectively at call time.

use crate::state::ConversationState;
use async_trait::async_trait;
use std::fmt;

/// Failure inside a node's own logic.
///
/// Returning one of these does **not** crash the graph: the guarded wrapper
/// converts it into a structured error state (see [`crate::wrapper`]). Nodes
/// whose failures should surface to the user as a turn-level error simply
/// return the error instead of masking it with a softer message.
#[derive(Debug, Clone)]
pub struct NodeError {
    message: String,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NodeError {}

impl From<String> for NodeError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for NodeError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A single processing step in an agent graph.
#[async_trait]
pub trait Node: Send + Sync {
    /// Stable node name, used in error tags, logs, and node-specific
    /// guardrail checks.
    fn name(&self) -> &'static str;

    /// Transform the state. Take it by value, return a new one.
    async fn run(&self, state: ConversationState) -> Result<ConversationState, NodeError>;
}
