//! Calendar agent: registers saved itineraries as calendar events.
//!
//! Failure policy differs from the conversational agents on purpose: a
//! calendar capability failure is fatal for the turn. The node logs and
//! returns the error instead of masking it; the guarded wrapper still
//! converts it into the standard error state, so the client sees a tagged
//! message rather than a crash.

use crate::deps::AgentDeps;
use crate::graphs::stream_edge;
use crate::share_extract::extract_itinerary_ids;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tripflow_clients::{Calendar, ItineraryStore};
use tripflow_core::{
    AgentGraph, ConversationState, GraphBuilder, Node, NodeError, NodeKey, Result, Step,
    StreamUpdateNode,
};

const CHUNK_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarKey {
    Calendar,
    UpdateStream,
}

impl NodeKey for CalendarKey {
    fn as_str(&self) -> &'static str {
        match self {
            CalendarKey::Calendar => "calendar",
            CalendarKey::UpdateStream => "update_stream",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "calendar" => Some(CalendarKey::Calendar),
            "update_stream" => Some(CalendarKey::UpdateStream),
            _ => None,
        }
    }
}

struct CalendarNode {
    calendar: Arc<dyn Calendar>,
    itineraries: Arc<dyn ItineraryStore>,
}

#[async_trait]
impl Node for CalendarNode {
    fn name(&self) -> &'static str {
        "calendar"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let mut ids = extract_itinerary_ids(&state.user_input);
        if ids.is_empty() {
            if let Some(id) = state.context.get("itinerary_id").and_then(|v| v.as_i64()) {
                ids.push(id);
            }
        }

        // Missing prerequisite data is a conversation, not an error.
        if ids.is_empty() {
            tracing::warn!("calendar request without itinerary ids");
            state.respond_complete(
                "일정을 먼저 생성해주세요. 그 후에 캘린더 기능을 사용할 수 있습니다.",
            );
            return Ok(state);
        }

        let mut lines = Vec::new();
        for id in &ids {
            let itinerary = self.itineraries.get(*id).await.map_err(|error| {
                tracing::error!(id, %error, "itinerary lookup failed");
                NodeError::new(format!("캘린더 등록 실패: {error}"))
            })?;

            let event = self.calendar.add_itinerary(&itinerary).await.map_err(|error| {
                tracing::error!(id, %error, "calendar registration failed");
                NodeError::new(format!("캘린더 등록 실패: {error}"))
            })?;

            lines.push(match event.html_link {
                Some(link) => format!(
                    "'{}' 일정이 캘린더에 추가되었습니다: {link}",
                    itinerary.title
                ),
                None => format!("'{}' 일정이 캘린더에 추가되었습니다.", itinerary.title),
            });
        }

        state.merge_context([("calendar_registered".to_string(), json!(ids))]);
        state.respond_complete(lines.join("\n"));
        Ok(state)
    }
}

/// Build the calendar graph.
pub fn build(deps: &AgentDeps) -> Result<AgentGraph<CalendarKey>> {
    use CalendarKey::*;

    GraphBuilder::new(deps.validator.clone(), deps.monitor.clone())
        .add_node(
            Calendar,
            CalendarNode {
                calendar: deps.calendar.clone(),
                itineraries: deps.itineraries.clone(),
            },
        )
        .add_node(UpdateStream, StreamUpdateNode::new(CHUNK_SIZE))
        .set_entry(Calendar)
        .add_conditional_edge(
            Calendar,
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
