//! The five agent graphs.
//!
//! Every graph shares the same skeleton: an entry node, domain processing
//! nodes, and the `update_stream` self-loop that chunks the response out.
//! Construction is `build(&AgentDeps) -> AgentGraph<Key>`; all structural
//! mistakes surface there, not at runtime.

pub mod calendar;
pub mod conversation;
pub mod itinerary;
pub mod place_search;
pub mod sharing;

use tripflow_core::{streaming_complete, ChatMessage, ConversationState, NodeKey, Role, Step};

/// The standard streaming conditional edge:
/// `is_complete ? END : update_stream`.
pub(crate) fn stream_edge<K: NodeKey>(
    stream_key: K,
) -> impl Fn(&ConversationState) -> Step<K> + Send + Sync + 'static {
    move |state| {
        if streaming_complete(state) {
            Step::End
        } else {
            Step::Node(stream_key)
        }
    }
}

/// Transcript to hand the model as history: everything except the trailing
/// user message (the prompt itself carries the current utterance).
pub(crate) fn chat_history(state: &ConversationState) -> Vec<ChatMessage> {
    let mut history = state.messages.clone();
    if history
        .last()
        .map(|m| m.role == Role::User && m.content == state.user_input)
        .unwrap_or(false)
    {
        history.pop();
    }
    history
}
