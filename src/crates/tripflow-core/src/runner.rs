//! Per-turn execution over checkpointed sessions.
//!
//! [`AgentRuntime`] binds a compiled graph to a session store and implements
//! the turn protocol:
//!
//! 1. acquire the session's turn lock (turns within a session are strictly
//!    ordered; sessions are independent),
//! 2. restore the checkpoint - or create fresh state, optionally seeded with
//!    caller-supplied history,
//! 3. walk the graph from the requested start node (unknown names fall back
//!    to the entry), streaming a [`TurnUpdate`] per node,
//! 4. checkpoint the final state once at the graph boundary.
//!
//! Nodes mutate an in-memory copy; the store sees exactly one
//! read-modify-write per turn.

use crate::error::{GraphError, Result};
use crate::graph::{AgentGraph, NodeKey, WalkOptions};
use crate::state::{ChatMessage, ConversationState, TurnUpdate};
use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use tripflow_session::SessionStore;

/// One incoming user turn.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Session id (checkpoint key and turn-lock key).
    pub session_id: String,
    /// Raw user utterance.
    pub message: String,
    /// Caller-requested start node; unknown names fall back to the entry.
    pub start_node: Option<String>,
    /// Intent label stamped into the state for diagnostics.
    pub intent: Option<String>,
    /// Transcript to seed a *fresh* session with (ignored when a checkpoint
    /// exists - the checkpoint is authoritative).
    pub history: Vec<ChatMessage>,
    /// Base URL for building absolute links this turn.
    pub base_url: Option<String>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A compiled graph bound to a session store.
pub struct AgentRuntime<K: NodeKey> {
    graph: Arc<AgentGraph<K>>,
    store: Arc<dyn SessionStore<ConversationState>>,
    options: WalkOptions,
}

impl<K: NodeKey> AgentRuntime<K> {
    pub fn new(graph: AgentGraph<K>, store: Arc<dyn SessionStore<ConversationState>>) -> Self {
        Self {
            graph: Arc::new(graph),
            store,
            options: WalkOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Process one turn, yielding a snapshot per executed node. The session
    /// checkpoint is written after the walk finishes; the turn lock is held
    /// for the whole stream.
    pub fn process(&self, request: TurnRequest) -> impl Stream<Item = Result<TurnUpdate>> + Send {
        let graph = Arc::clone(&self.graph);
        let store = Arc::clone(&self.store);
        let options = self.options.clone();

        async_stream::stream! {
            let _turn = store.turn_lock(&request.session_id).await;

            let checkpoint = match store.get_state(&request.session_id).await {
                Ok(checkpoint) => checkpoint,
                Err(error) => {
                    yield Err(GraphError::Checkpoint(error.to_string()));
                    return;
                }
            };

            let mut state = match checkpoint {
                Some(previous) => {
                    tracing::debug!(session_id = %request.session_id, "resuming session");
                    ConversationState::resume(previous, request.message.as_str())
                }
                None => {
                    tracing::debug!(session_id = %request.session_id, "starting session");
                    let mut fresh =
                        ConversationState::new(request.session_id.as_str(), request.message.as_str());
                    if !request.history.is_empty() {
                        let mut seeded = request.history.clone();
                        seeded.append(&mut fresh.messages);
                        fresh.messages = seeded;
                    }
                    fresh
                }
            };

            if request.intent.is_some() {
                state.intent = request.intent.clone();
            }
            if request.base_url.is_some() {
                state.config_data.base_url = request.base_url.clone();
            }
            state.next_node = request.start_node.clone();

            let start = graph.resolve_start(request.start_node.as_deref());
            let mut final_state: Option<ConversationState> = None;

            {
                let mut walk = pin!(graph.walk(state, start, options));
                while let Some(item) = walk.next().await {
                    match item {
                        Ok((state, update)) => {
                            final_state = Some(state);
                            yield Ok(update);
                        }
                        Err(error) => {
                            yield Err(error);
                            break;
                        }
                    }
                }
            }

            if let Some(state) = final_state {
                if let Err(error) = store.checkpoint(&request.session_id, state).await {
                    yield Err(GraphError::Checkpoint(error.to_string()));
                }
            }
        }
    }

    /// Convenience for non-streaming callers: run the turn to completion and
    /// return every snapshot.
    pub async fn process_collect(&self, request: TurnRequest) -> Result<Vec<TurnUpdate>> {
        let mut stream = pin!(self.process(request));
        let mut updates = Vec::new();
        while let Some(item) = stream.next().await {
            updates.push(item?);
        }
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Step};
    use crate::node::{Node, NodeError};
    use crate::streaming::StreamUpdateNode;
    use async_trait::async_trait;
    use std::time::Duration;
    use tripflow_guardrail::{ResponseMonitor, ResponseValidator};
    use tripflow_session::InMemorySessionStore;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        Speak,
        UpdateStream,
    }

    impl NodeKey for Key {
        fn as_str(&self) -> &'static str {
            match self {
                Key::Speak => "speak",
                Key::UpdateStream => "update_stream",
            }
        }

        fn parse(name: &str) -> Option<Self> {
            match name {
                "speak" => Some(Key::Speak),
                "update_stream" => Some(Key::UpdateStream),
                _ => None,
            }
        }
    }

    struct Speak;

    #[async_trait]
    impl Node for Speak {
        fn name(&self) -> &'static str {
            "speak"
        }

        async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
            state.begin_streaming("가나다라마바사아자차카타파하", 4);
            Ok(state)
        }
    }

    fn runtime() -> AgentRuntime<Key> {
        let graph = GraphBuilder::new(
            Arc::new(ResponseValidator::new()),
            Arc::new(ResponseMonitor::new()),
        )
        .add_node(Key::Speak, Speak)
        .add_node(Key::UpdateStream, StreamUpdateNode::new(4))
        .set_entry(Key::Speak)
        .add_conditional_edge(
            Key::Speak,
            |state| {
                if crate::streaming::streaming_complete(state) {
                    Step::End
                } else {
                    Step::Node(Key::UpdateStream)
                }
            },
            vec![Step::Node(Key::UpdateStream), Step::End],
        )
        .add_conditional_edge(
            Key::UpdateStream,
            |state| {
                if crate::streaming::streaming_complete(state) {
                    Step::End
                } else {
                    Step::Node(Key::UpdateStream)
                }
            },
            vec![Step::Node(Key::UpdateStream), Step::End],
        )
        .compile()
        .unwrap();

        AgentRuntime::new(graph, Arc::new(InMemorySessionStore::new())).with_options(WalkOptions {
            pacing: Duration::ZERO,
            ..WalkOptions::default()
        })
    }

    #[tokio::test]
    async fn turn_streams_partials_then_completes() {
        let runtime = runtime();
        let updates = runtime
            .process_collect(TurnRequest::new("s-1", "노래해줘"))
            .await
            .unwrap();

        assert!(updates.len() > 2);
        assert!(!updates[0].is_final());
        assert!(updates.last().unwrap().is_final());

        let positions: Vec<usize> = updates
            .iter()
            .filter_map(|u| u.streaming.as_ref().map(|c| c.current_position))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn second_turn_resumes_checkpoint() {
        let runtime = runtime();
        runtime
            .process_collect(TurnRequest::new("s-1", "첫번째"))
            .await
            .unwrap();
        let updates = runtime
            .process_collect(TurnRequest::new("s-1", "두번째"))
            .await
            .unwrap();

        let last = updates.last().unwrap();
        // first user + first response + second user + second response
        assert_eq!(last.messages.len(), 4);
    }

    #[tokio::test]
    async fn history_seeds_fresh_sessions_only() {
        let runtime = runtime();
        let mut request = TurnRequest::new("s-1", "이어서 해줘");
        request.history = vec![
            ChatMessage::user("예전 질문"),
            ChatMessage::assistant("예전 답변"),
        ];

        let updates = runtime.process_collect(request.clone()).await.unwrap();
        assert_eq!(updates.last().unwrap().messages.len(), 4);

        // A second turn with history again must not re-seed.
        let updates = runtime.process_collect(request).await.unwrap();
        assert_eq!(updates.last().unwrap().messages.len(), 6);
    }
}
