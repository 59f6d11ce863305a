//! Itinerary agent: slot collection, the tool-using planning loop, and
//! saved-itinerary listing.

use crate::deps::AgentDeps;
use crate::extract::extract_travel_info;
use crate::graphs::{chat_history, stream_edge};
use crate::prompts::{render, ITINERARY_SYSTEM};
use crate::tools::{CalendarRegisterTool, PlaceSearchTool, ToolLoop};
use async_trait::async_trait;
use std::sync::Arc;
use tripflow_clients::ItineraryStore;
use tripflow_core::{
    AgentGraph, ConversationState, GraphBuilder, Node, NodeError, NodeKey, Result, Step,
    StreamUpdateNode,
};

/// Reveal size per streaming tick for generated plans.
const CHUNK_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItineraryKey {
    AskInfo,
    Generate,
    List,
    UpdateStream,
}

impl NodeKey for ItineraryKey {
    fn as_str(&self) -> &'static str {
        match self {
            ItineraryKey::AskInfo => "ask_info",
            ItineraryKey::Generate => "generate",
            ItineraryKey::List => "list",
            ItineraryKey::UpdateStream => "update_stream",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "ask_info" => Some(ItineraryKey::AskInfo),
            "generate" => Some(ItineraryKey::Generate),
            "list" => Some(ItineraryKey::List),
            "update_stream" => Some(ItineraryKey::UpdateStream),
            _ => None,
        }
    }
}

/// Extract travel slots and either ask for what is still missing or hand
/// over to generation.
struct AskInfoNode;

#[async_trait]
impl Node for AskInfoNode {
    fn name(&self) -> &'static str {
        "ask_info"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let info = extract_travel_info(&state.user_input);
        state.merge_context(info.context_updates());

        // Judge missing slots against accumulated context, not just this
        // utterance - a prior turn may already have answered.
        let mut missing = Vec::new();
        if state.context_str("destination").is_none() {
            missing.push("어느 지역");
        }
        if state.context_str("duration").is_none() {
            missing.push("여행 기간");
        }

        if missing.is_empty() {
            state.next_node = Some("generate".to_string());
        } else {
            state.respond_complete(format!(
                "여행 일정을 만들기 위해 {}에 대한 정보가 필요합니다. 알려주실 수 있나요? (예: 서울지역, 3박 4일)",
                missing.join(", ")
            ));
        }
        Ok(state)
    }
}

/// The planning loop. Model failures that survive the overload retry become
/// a user-visible itinerary-generation error; the turn still completes.
struct GenerateNode {
    tool_loop: ToolLoop,
}

#[async_trait]
impl Node for GenerateNode {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let system = render(
            ITINERARY_SYSTEM,
            &[
                ("tools", &self.tool_loop.tool_descriptions()),
                ("tool_names", &self.tool_loop.tool_names()),
            ],
        );

        let known: Vec<String> = ["destination", "duration", "travelers", "budget"]
            .iter()
            .filter_map(|key| {
                state
                    .context_str(key)
                    .map(|value| format!("{key}: {value}"))
            })
            .collect();
        let task = if known.is_empty() {
            state.user_input.clone()
        } else {
            format!("{}\n\n알려진 정보:\n{}", state.user_input, known.join("\n"))
        };

        match self
            .tool_loop
            .run(&system, &task, &chat_history(&state))
            .await
        {
            Ok(plan) => state.begin_streaming(plan, CHUNK_SIZE),
            Err(error) => {
                tracing::error!(%error, "itinerary generation failed");
                state.respond_complete(format!("[여행 일정 생성 오류] {error}"));
            }
        }
        Ok(state)
    }
}

/// List the user's saved itineraries.
struct ListNode {
    itineraries: Arc<dyn ItineraryStore>,
}

#[async_trait]
impl Node for ListNode {
    fn name(&self) -> &'static str {
        "list"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let user_id = state.config_data.user_id.unwrap_or(1);
        let itineraries = self
            .itineraries
            .list_for_user(user_id)
            .await
            .map_err(|error| NodeError::new(format!("일정 목록 조회 실패: {error}")))?;

        let response = if itineraries.is_empty() {
            "저장된 여행 일정이 아직 없습니다. 먼저 일정을 만들어보세요.".to_string()
        } else {
            itineraries
                .iter()
                .map(|itinerary| {
                    format!(
                        "id: {} 일정: {} - 장소: {} - 날짜: {}",
                        itinerary.id, itinerary.title, itinerary.destination, itinerary.date
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        state.respond_complete(response);
        Ok(state)
    }
}

/// Build the itinerary graph.
pub fn build(deps: &AgentDeps) -> Result<AgentGraph<ItineraryKey>> {
    use ItineraryKey::*;

    let tool_loop = ToolLoop::new(
        deps.llm.clone(),
        vec![
            Arc::new(PlaceSearchTool::new(
                deps.places.clone(),
                deps.search_cache.clone(),
            )),
            Arc::new(CalendarRegisterTool::new(
                deps.calendar.clone(),
                deps.itineraries.clone(),
            )),
        ],
    );

    GraphBuilder::new(deps.validator.clone(), deps.monitor.clone())
        .add_node(AskInfo, AskInfoNode)
        .add_node(Generate, GenerateNode { tool_loop })
        .add_node(
            List,
            ListNode {
                itineraries: deps.itineraries.clone(),
            },
        )
        .add_node(UpdateStream, StreamUpdateNode::new(CHUNK_SIZE))
        .set_entry(AskInfo)
        .add_conditional_edge(
            AskInfo,
            |state| {
                if state.next_node.as_deref() == Some("generate") {
                    Step::Node(Generate)
                } else {
                    Step::End
                }
            },
            vec![Step::Node(Generate), Step::End],
        )
        .add_conditional_edge(
            Generate,
            stream_edge(UpdateStream),
            vec![Step::Node(UpdateStream), Step::End],
        )
        .add_conditional_edge(
            List,
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
