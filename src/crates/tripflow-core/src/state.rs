//! The universal conversation state record.
//!
//! Every node in every agent graph receives a [`ConversationState`] and
//! returns a new one. The struct replaces the dict-shaped state of typical
//! graph frameworks with one explicit record so aliasing and shape drift are
//! compile-time concerns:
//!
//! - `messages` is append-only; only the *content* of the last assistant
//!   message may be rewritten in place, and only by the streaming machinery.
//! - `context` accumulates slot-filled information across turns through
//!   [`ConversationState::merge_context`], which never lets an empty
//!   extraction erase a known value.
//! - `streaming` carries the chunked-reveal cursor (see [`crate::streaming`]).
//! - `next_node` is a wire-level routing hint; graphs parse it into their
//!   closed node-key enums, falling back to the graph entry when it names
//!   nothing.

use crate::streaming::{StreamCursor, STREAM_NODE_NAME};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Session/thread identity plus caller-supplied options carried through a
/// turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Session id; doubles as the checkpoint key.
    pub thread_id: String,
    /// Owning user, when the hosting layer knows one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Base URL for building absolute share links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// The working record passed through every node of every agent graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Latest raw user utterance.
    #[serde(default)]
    pub user_input: String,

    /// Full transcript, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Accumulated slot-filled information (destination, search results,
    /// share settings, ...). Merged, never wholesale-replaced.
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Name of the node to transition to next; also the streaming
    /// self-loop signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,

    /// Last-classified intent label, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Chunked-reveal cursor for the in-flight response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<StreamCursor>,

    /// Externally visible text for the current turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Session identity and caller options.
    #[serde(default)]
    pub config_data: ConfigData,

    /// Set when a node failed and the wrapper contained it; ends the walk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversationState {
    /// Fresh state for a session's first turn. The utterance is appended to
    /// the transcript immediately.
    pub fn new(thread_id: impl Into<String>, user_input: impl Into<String>) -> Self {
        let user_input = user_input.into();
        Self {
            messages: vec![ChatMessage::user(user_input.clone())],
            user_input,
            config_data: ConfigData {
                thread_id: thread_id.into(),
                ..ConfigData::default()
            },
            ..Self::default()
        }
    }

    /// Resume from a checkpoint for a new turn: keep transcript and context,
    /// take the new utterance, clear per-turn output fields.
    pub fn resume(checkpoint: ConversationState, user_input: impl Into<String>) -> Self {
        let user_input = user_input.into();
        let mut state = checkpoint;
        state.messages.push(ChatMessage::user(user_input.clone()));
        state.user_input = user_input;
        state.next_node = None;
        state.streaming = None;
        state.response = None;
        state.error = None;
        state
    }

    /// Session id shorthand.
    pub fn session_id(&self) -> &str {
        &self.config_data.thread_id
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Content of the most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
    }

    /// Merge extracted values into `context`. A key is written only when the
    /// incoming value is non-empty, so an extractor that found nothing can
    /// never erase a previously known value.
    pub fn merge_context<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in updates {
            if is_empty_value(&value) {
                continue;
            }
            self.context.insert(key, value);
        }
    }

    /// String-valued context lookup.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }

    /// Seed a response and its streaming cursor, revealing the first chunk
    /// immediately so callers always observe at least one partial state
    /// before completion.
    pub fn begin_streaming(&mut self, full_text: impl Into<String>, chunk_size: usize) {
        let full_text = full_text.into();
        let mut cursor = StreamCursor::start(full_text.clone());
        cursor.advance(chunk_size);
        self.push_assistant(cursor.visible_prefix());
        self.response = Some(full_text);
        self.next_node = if cursor.is_complete {
            None
        } else {
            Some(STREAM_NODE_NAME.to_string())
        };
        self.streaming = Some(cursor);
    }

    /// Record a response that needs no chunked reveal (short follow-up
    /// questions, canned notices).
    pub fn respond_complete(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.push_assistant(text.clone());
        self.streaming = Some(StreamCursor::completed(text.clone()));
        self.response = Some(text);
        self.next_node = None;
    }
}

/// Values `merge_context` refuses to write.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Wire-level snapshot of a state, shaped for the streamed turn protocol.
///
/// One of these is emitted after every node execution; the sequence ends
/// when `streaming.is_complete` is true or the graph reached its terminal
/// without streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<StreamCursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnUpdate {
    pub fn from_state(state: &ConversationState) -> Self {
        Self {
            response: state.response.clone(),
            messages: state.messages.clone(),
            context: state.context.clone(),
            intent: state.intent.clone(),
            next_node: state.next_node.clone(),
            streaming: state.streaming.clone(),
            error: state.error.clone(),
        }
    }

    /// True when this snapshot terminates the turn's stream.
    pub fn is_final(&self) -> bool {
        self.error.is_some()
            || self
                .streaming
                .as_ref()
                .map(|cursor| cursor.is_complete)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_state_appends_utterance() {
        let state = ConversationState::new("s-1", "안녕하세요");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.user_input, "안녕하세요");
        assert_eq!(state.session_id(), "s-1");
    }

    #[test]
    fn resume_keeps_transcript_and_clears_turn_fields() {
        let mut first = ConversationState::new("s-1", "서울 여행 일정 짜줘");
        first.push_assistant("서울 일정을 추천드립니다");
        first.response = Some("서울 일정을 추천드립니다".into());
        first.error = Some("stale".into());
        first.context.insert("destination".into(), json!("서울"));

        let resumed = ConversationState::resume(first, "3박 4일로 부탁해");
        assert_eq!(resumed.messages.len(), 3);
        assert_eq!(resumed.user_input, "3박 4일로 부탁해");
        assert_eq!(resumed.response, None);
        assert_eq!(resumed.error, None);
        assert_eq!(resumed.streaming, None);
        assert_eq!(resumed.context_str("destination"), Some("서울"));
    }

    #[test]
    fn empty_extraction_never_overwrites_known_context() {
        let mut state = ConversationState::new("s-1", "hi");
        state.merge_context([("destination".to_string(), json!("Seoul"))]);
        state.merge_context([
            ("destination".to_string(), json!("")),
            ("duration".to_string(), json!(Value::Null)),
        ]);
        assert_eq!(state.context_str("destination"), Some("Seoul"));
        assert!(!state.context.contains_key("duration"));
    }

    #[test]
    fn non_empty_extraction_overwrites() {
        let mut state = ConversationState::new("s-1", "hi");
        state.merge_context([("destination".to_string(), json!("Seoul"))]);
        state.merge_context([("destination".to_string(), json!("Busan"))]);
        assert_eq!(state.context_str("destination"), Some("Busan"));
    }

    #[test]
    fn begin_streaming_reveals_first_chunk() {
        let mut state = ConversationState::new("s-1", "hi");
        state.begin_streaming("가나다라마바사아자차", 4);

        let cursor = state.streaming.as_ref().unwrap();
        assert_eq!(cursor.current_position, 4);
        assert!(!cursor.is_complete);
        assert_eq!(state.last_assistant().unwrap().content, "가나다라");
        assert_eq!(state.next_node.as_deref(), Some(STREAM_NODE_NAME));
        assert_eq!(state.response.as_deref(), Some("가나다라마바사아자차"));
    }

    #[test]
    fn begin_streaming_short_text_completes_immediately() {
        let mut state = ConversationState::new("s-1", "hi");
        state.begin_streaming("네", 40);
        assert!(state.streaming.as_ref().unwrap().is_complete);
        assert_eq!(state.next_node, None);
    }

    #[test]
    fn turn_update_final_detection() {
        let mut state = ConversationState::new("s-1", "hi");
        assert!(!TurnUpdate::from_state(&state).is_final());

        state.respond_complete("안내드립니다");
        assert!(TurnUpdate::from_state(&state).is_final());

        let mut errored = ConversationState::new("s-1", "hi");
        errored.error = Some("boom".into());
        assert!(TurnUpdate::from_state(&errored).is_final());
    }
}
