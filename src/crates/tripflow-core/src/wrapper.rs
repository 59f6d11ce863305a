//! The guarded node wrapper.
//!
//! [`Guarded`] decorates every node registered in a graph (the builder
//! applies it unconditionally - no node is exempt) and enforces the common
//! node contract in one place:
//!
//! 1. **State sanitation** - every existing assistant message is re-run
//!    through the guardrail validator before the node sees the state.
//! 2. **Error containment** - a failing node becomes a structured error
//!    state: prior fields preserved, an `[<node> 오류] <message>` assistant
//!    entry appended, `response` set to the same text and `error` to the
//!    message. The wrapper itself never returns `Err`, so a node failure
//!    ends the turn gracefully instead of crashing the walk.
//! 3. **Response backfill** - a result with no `response` derives one from
//!    the last assistant message, falling back to the user input.
//! 4. **Monitor + validate** - the response monitor analyzes the last
//!    assistant message (log-only), then the validator's text passes and the
//!    node-specific post-checks run, and any rewrite lands in both the
//!    message entry and `response`.
//!
//! This is the mechanism by which cross-cutting validation and error
//! containment are enforced without each node re-implementing them.

use crate::node::{Node, NodeError};
use crate::state::{ConversationState, Role};
use async_trait::async_trait;
use std::sync::Arc;
use tripflow_guardrail::{apply_node_checks, ResponseMonitor, ResponseValidator};

/// Decorator applying the uniform node contract around an inner node.
pub struct Guarded {
    inner: Arc<dyn Node>,
    validator: Arc<ResponseValidator>,
    monitor: Arc<ResponseMonitor>,
}

impl Guarded {
    pub fn new(
        inner: Arc<dyn Node>,
        validator: Arc<ResponseValidator>,
        monitor: Arc<ResponseMonitor>,
    ) -> Self {
        Self {
            inner,
            validator,
            monitor,
        }
    }

    /// Re-validate assistant-authored content already present in the state.
    fn sanitize(&self, state: &mut ConversationState) {
        for message in &mut state.messages {
            if message.role == Role::Assistant {
                let validated = self.validator.validate(&message.content);
                if validated.text != message.content {
                    message.content = validated.text;
                }
            }
        }
    }

    /// Build the contained-failure state.
    fn error_state(&self, mut state: ConversationState, error: &NodeError) -> ConversationState {
        let text = format!("[{} 오류] {}", self.inner.name(), error.message());
        state.push_assistant(text.clone());
        state.response = Some(text);
        state.error = Some(error.message().to_string());
        state.next_node = None;
        state
    }

    /// Backfill `response`, then run the monitor and validation passes over
    /// the last assistant message.
    fn finalize(&self, mut state: ConversationState) -> ConversationState {
        if state.response.is_none() {
            state.response = Some(
                state
                    .last_assistant()
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| state.user_input.clone()),
            );
        }

        let node_name = self.inner.name();
        let session_id = state.config_data.thread_id.clone();

        let Some(index) = state
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return state;
        };
        let content = state.messages[index].content.clone();

        // Log-only analysis; the report never changes routing.
        self.monitor
            .analyze_and_log(&content, Some(node_name), Some(&session_id));

        let validated = self.validator.validate(&content).text;
        let checked = apply_node_checks(node_name, validated);
        if checked != content {
            tracing::info!(node = node_name, "response rewritten by guardrail");
            state.messages[index].content = checked.clone();
        }
        // `response` always mirrors the validated message content, so a
        // rewrite on an earlier streaming tick can never leave it stale.
        state.response = Some(checked);

        state
    }
}

#[async_trait]
impl Node for Guarded {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, NodeError> {
        let node_name = self.inner.name();
        tracing::debug!(node = node_name, input = %truncate(&state.user_input, 30), "node start");

        self.sanitize(&mut state);

        let prior = state.clone();
        let result = match self.inner.run(state).await {
            Ok(next) => next,
            Err(error) => {
                tracing::error!(node = node_name, %error, "node failed; containing");
                return Ok(self.error_state(prior, &error));
            }
        };

        let result = self.finalize(result);
        tracing::debug!(node = node_name, "node complete");
        Ok(result)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
