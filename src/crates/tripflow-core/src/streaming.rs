//! Chunked response streaming.
//!
//! A node that produces a response does so with the full text already in
//! hand (the capability call has completed). To simulate token-by-token
//! delivery, the graph re-enters a single *stream update* node that reveals
//! a larger prefix of the text on every tick until the whole response is
//! visible:
//!
//! ```text
//!   generate ──▶ update_stream ──▶ update_stream ──▶ ... ──▶ END
//!                (pos += chunk)     (pos += chunk)      (is_complete)
//! ```
//!
//! The cursor is measured in **characters**, not bytes - responses are
//! Korean and a byte cursor would split codepoints.
//!
//! Pacing between ticks (the "typing" delay) is *not* implemented here; the
//! graph walker inserts a configurable cooperative sleep between incomplete
//! ticks so one session's delay never stalls another.

use crate::node::{Node, NodeError};
use crate::state::{ConversationState, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Node name every graph uses for its stream-update self-loop.
pub const STREAM_NODE_NAME: &str = "update_stream";

/// Default reveal size per tick, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 40;

/// Cursor into a not-yet-fully-revealed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCursor {
    /// The complete response text.
    pub message: String,
    /// Number of characters currently revealed. Monotonically non-decreasing
    /// within one response.
    pub current_position: usize,
    /// True exactly when `current_position` reached the character count of
    /// `message`.
    pub is_complete: bool,
}

impl StreamCursor {
    /// Cursor at position zero. An empty message is complete from the start.
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();
        let is_complete = message.is_empty();
        Self {
            message,
            current_position: 0,
            is_complete,
        }
    }

    /// Cursor for a message that needs no reveal.
    pub fn completed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            current_position: message.chars().count(),
            is_complete: true,
            message,
        }
    }

    /// Total character count of the message.
    pub fn total_chars(&self) -> usize {
        self.message.chars().count()
    }

    /// Advance the cursor by `chunk_size` characters, clamped to the end of
    /// the message. Advancing a completed cursor is a no-op: it never
    /// re-extends or resets.
    pub fn advance(&mut self, chunk_size: usize) {
        if self.is_complete {
            return;
        }
        let total = self.total_chars();
        self.current_position = (self.current_position + chunk_size).min(total);
        self.is_complete = self.current_position >= total;
    }

    /// The revealed prefix.
    pub fn visible_prefix(&self) -> String {
        self.message.chars().take(self.current_position).collect()
    }
}

/// True when the state has no pending reveal work. Graphs use this as the
/// self-loop predicate: `streaming_complete ? END : update_stream`.
pub fn streaming_complete(state: &ConversationState) -> bool {
    state
        .streaming
        .as_ref()
        .map(|cursor| cursor.is_complete)
        .unwrap_or(true)
}

/// The shared stream-update node: one tick of the reveal loop.
///
/// Advances the cursor, rewrites the last assistant message's content to the
/// revealed prefix, and requests itself as successor until the cursor
/// completes. A state with no cursor, or an already-complete one, passes
/// through untouched.
pub struct StreamUpdateNode {
    chunk_size: usize,
}

impl StreamUpdateNode {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for StreamUpdateNode {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[async_trait]
impl Node for StreamUpdateNode {
    fn name(&self) -> &'static str {
        STREAM_NODE_NAME
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, NodeError> {
        let Some(mut cursor) = state.streaming.take() else {
            return Ok(state);
        };
        if cursor.is_complete {
            state.streaming = Some(cursor);
            return Ok(state);
        }

        cursor.advance(self.chunk_size);
        let prefix = cursor.visible_prefix();
        let done = cursor.is_complete;
        state.streaming = Some(cursor);

        match state.messages.iter().rposition(|m| m.role == Role::Assistant) {
            Some(index) => state.messages[index].content = prefix,
            None => state.push_assistant(prefix),
        }
        state.next_node = if done {
            None
        } else {
            Some(STREAM_NODE_NAME.to_string())
        };

        Ok(state)
    }
}
