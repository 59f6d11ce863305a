//! Sharing agent: turns a share request into an expiring link.
//!
//! A missing itinerary id is a recoverable condition - the user is asked to
//! create an itinerary first. A link-creation failure is also soft: the
//! response reports the failure and invites a retry.

use crate::deps::AgentDeps;
use crate::graphs::stream_edge;
use crate::share_extract::{extract_share_request, ShareRequest};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tripflow_clients::sharing::ShareType;
use tripflow_clients::ShareLinks;
use tripflow_core::{
    AgentGraph, ConversationState, GraphBuilder, Node, NodeError, NodeKey, Result, Step,
    StreamUpdateNode,
};

const CHUNK_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharingKey {
    Sharing,
    UpdateStream,
}

impl NodeKey for SharingKey {
    fn as_str(&self) -> &'static str {
        match self {
            SharingKey::Sharing => "sharing",
            SharingKey::UpdateStream => "update_stream",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "sharing" => Some(SharingKey::Sharing),
            "update_stream" => Some(SharingKey::UpdateStream),
            _ => None,
        }
    }
}

struct SharingNode {
    share_links: Arc<dyn ShareLinks>,
}

#[async_trait]
impl Node for SharingNode {
    fn name(&self) -> &'static str {
        "sharing"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let request = extract_share_request(&state.user_input).unwrap_or_else(ShareRequest::default);

        let itinerary_id = request
            .itinerary_ids
            .first()
            .copied()
            .or_else(|| state.context.get("itinerary_id").and_then(|v| v.as_i64()));

        let Some(itinerary_id) = itinerary_id else {
            tracing::warn!("share request without an itinerary id");
            state.respond_complete(
                "일정을 먼저 생성해주세요. 그 후에 공유 기능을 사용할 수 있습니다.",
            );
            return Ok(state);
        };

        let share_type_text = match request.share_type {
            ShareType::View => "읽기 전용",
            ShareType::Edit => "편집 가능",
        };
        let mut response = format!(
            "네, {}일 동안 유효한 {} 공유 링크를 생성했습니다.{}",
            request.days,
            share_type_text,
            request.method.response_sentence()
        );

        let result = self
            .share_links
            .create_share_link(
                itinerary_id,
                request.share_type,
                request.days,
                state.config_data.base_url.as_deref(),
            )
            .await;

        let status = match result {
            Ok(link) => {
                response.push_str(&format!(
                    "\n\n📤 공유 링크: {}\n만료일: {}",
                    link.share_url,
                    link.expires_at.date_naive()
                ));
                "success"
            }
            Err(error) => {
                tracing::error!(%error, "share link creation failed");
                response.push_str(
                    "\n\n공유 링크 생성 중 오류가 발생했습니다. 나중에 다시 시도해주세요.",
                );
                "failed"
            }
        };

        state.merge_context([
            ("itinerary_id".to_string(), json!(itinerary_id)),
            (
                "share_info".to_string(),
                json!({
                    "share_type": share_type_text,
                    "days": request.days,
                    "share_method": request.method.as_str(),
                    "status": status,
                }),
            ),
        ]);
        state.begin_streaming(response, CHUNK_SIZE);
        Ok(state)
    }
}

/// Build the sharing graph.
pub fn build(deps: &AgentDeps) -> Result<AgentGraph<SharingKey>> {
    use SharingKey::*;

    GraphBuilder::new(deps.validator.clone(), deps.monitor.clone())
        .add_node(
            Sharing,
            SharingNode {
                share_links: deps.share_links.clone(),
            },
        )
        .add_node(UpdateStream, StreamUpdateNode::new(CHUNK_SIZE))
        .set_entry(Sharing)
        .add_conditional_edge(
            Sharing,
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
