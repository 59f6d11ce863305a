//! General conversation agent: greetings, small talk, farewells.

use crate::deps::AgentDeps;
use crate::graphs::{chat_history, stream_edge};
use crate::prompts::{CONVERSATION_SYSTEM, GREETING_SYSTEM};
use async_trait::async_trait;
use std::sync::Arc;
use tripflow_core::{
    AgentGraph, ChatMessage, ConversationState, GraphBuilder, Node, NodeError, NodeKey, Result,
    Step, StreamUpdateNode,
};
use tripflow_llm::LlmClient;

/// Reveal size per streaming tick for conversational replies.
const CHUNK_SIZE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationKey {
    Router,
    Greeting,
    Conversation,
    Farewell,
    UpdateStream,
}

impl NodeKey for ConversationKey {
    fn as_str(&self) -> &'static str {
        match self {
            ConversationKey::Router => "router",
            ConversationKey::Greeting => "greeting",
            ConversationKey::Conversation => "conversation",
            ConversationKey::Farewell => "farewell",
            ConversationKey::UpdateStream => "update_stream",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "router" => Some(ConversationKey::Router),
            "greeting" => Some(ConversationKey::Greeting),
            "conversation" => Some(ConversationKey::Conversation),
            "farewell" => Some(ConversationKey::Farewell),
            "update_stream" => Some(ConversationKey::UpdateStream),
            _ => None,
        }
    }
}

/// Entry fallback: fills in a routing hint when the caller supplied none.
struct RouterNode;

#[async_trait]
impl Node for RouterNode {
    fn name(&self) -> &'static str {
        "router"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        if state.next_node.is_none() {
            state.next_node = Some("conversation".to_string());
        }
        Ok(state)
    }
}

/// LLM-backed reply with the given system persona. An LLM failure becomes a
/// user-visible apology; the turn still completes.
struct GenerateReply {
    node_name: &'static str,
    system: &'static str,
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Node for GenerateReply {
    fn name(&self) -> &'static str {
        self.node_name
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let mut history = vec![ChatMessage::system(self.system)];
        history.extend(chat_history(&state));

        match self.llm.generate(&state.user_input, &history).await {
            Ok(text) => state.begin_streaming(text, CHUNK_SIZE),
            Err(error) => {
                tracing::error!(node = self.node_name, %error, "reply generation failed");
                state.respond_complete(format!("[대화 생성 오류] {error}"));
            }
        }
        Ok(state)
    }
}

/// Canned goodbye for the end intent.
struct FarewellNode;

#[async_trait]
impl Node for FarewellNode {
    fn name(&self) -> &'static str {
        "farewell"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        state.respond_complete("대화를 종료합니다. 즐거운 여행 되세요!");
        Ok(state)
    }
}

/// Build the conversation graph.
pub fn build(deps: &AgentDeps) -> Result<AgentGraph<ConversationKey>> {
    use ConversationKey::*;

    GraphBuilder::new(deps.validator.clone(), deps.monitor.clone())
        .add_node(Router, RouterNode)
        .add_node(
            Greeting,
            GenerateReply {
                node_name: "greeting",
                system: GREETING_SYSTEM,
                llm: deps.llm.clone(),
            },
        )
        .add_node(
            Conversation,
            GenerateReply {
                node_name: "conversation",
                system: CONVERSATION_SYSTEM,
                llm: deps.llm.clone(),
            },
        )
        .add_node(Farewell, FarewellNode)
        .add_node(UpdateStream, StreamUpdateNode::new(CHUNK_SIZE))
        .set_entry(Router)
        .add_conditional_edge(
            Router,
            |state| match state.next_node.as_deref() {
                Some("greeting") => Step::Node(Greeting),
                Some("farewell") => Step::Node(Farewell),
                _ => Step::Node(Conversation),
            },
            vec![
                Step::Node(Greeting),
                Step::Node(Farewell),
                Step::Node(Conversation),
            ],
        )
        .add_conditional_edge(
            Greeting,
            stream_edge(UpdateStream),
            vec![Step::Node(UpdateStream), Step::End],
        )
        .add_conditional_edge(
            Conversation,
            stream_edge(UpdateStream),
            vec![Step::Node(UpdateStream), Step::End],
        )
        .add_conditional_edge(
            Farewell,
            stream_edge(UpdateStream),
            vec![Step::Node(UpdateStream), Step::End],
        )
        .add_conditional_edge(
            UpdateStream,
            stream_edge(UpdateStream),
            vec![Step::Node(UpdateStream), Step::End],
        )
        .compile()
}
