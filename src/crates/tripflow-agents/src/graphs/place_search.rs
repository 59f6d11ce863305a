//! Place-search agent: slot extraction, cached keyword search, formatted
//! results.

use crate::deps::AgentDeps;
use crate::place_parse::{
    build_search_query, format_places, parse_place_info, PlaceQuery, DEFAULT_COUNT,
    DEFAULT_LOCATION,
};
use crate::graphs::stream_edge;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tripflow_clients::{PlaceSearch, SearchCache};
use tripflow_core::{
    AgentGraph, ConversationState, GraphBuilder, Node, NodeError, NodeKey, Result, Step,
    StreamUpdateNode,
};

/// Reveal size per streaming tick for search listings.
const CHUNK_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceSearchKey {
    AskInfo,
    Search,
    UpdateStream,
}

impl NodeKey for PlaceSearchKey {
    fn as_str(&self) -> &'static str {
        match self {
            PlaceSearchKey::AskInfo => "ask_info",
            PlaceSearchKey::Search => "search",
            PlaceSearchKey::UpdateStream => "update_stream",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "ask_info" => Some(PlaceSearchKey::AskInfo),
            "search" => Some(PlaceSearchKey::Search),
            "update_stream" => Some(PlaceSearchKey::UpdateStream),
            _ => None,
        }
    }
}

/// Rebuild the query slots from accumulated context (so answers given in
/// earlier turns keep counting).
fn query_from_context(state: &ConversationState) -> PlaceQuery {
    PlaceQuery {
        location: state.context_str("location").map(str::to_string),
        category: state.context_str("category").map(str::to_string),
        subcategory: state.context_str("subcategory").map(str::to_string),
        mood: state.context_str("mood").map(str::to_string),
        price_range: state.context_str("price_range").map(str::to_string),
        count: state
            .context
            .get("count")
            .and_then(serde_json::Value::as_u64)
            .map(|n| n as usize),
    }
}

struct AskInfoNode;

#[async_trait]
impl Node for AskInfoNode {
    fn name(&self) -> &'static str {
        "ask_info"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let parsed = parse_place_info(&state.user_input);
        state.merge_context(parsed.context_updates());

        let missing = query_from_context(&state).missing_info();
        if missing.is_empty() {
            state.next_node = Some("search".to_string());
        } else {
            state.respond_complete(format!(
                "더 정확한 추천을 위해 {}를 알려주실 수 있나요?",
                missing.join(", ")
            ));
        }
        Ok(state)
    }
}

/// Execute the search through the injected cache. An external search
/// failure is wrapped into a node error and contained by the wrapper.
struct SearchNode {
    places: Arc<dyn PlaceSearch>,
    cache: Arc<SearchCache>,
}

#[async_trait]
impl Node for SearchNode {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, mut state: ConversationState) -> std::result::Result<ConversationState, NodeError> {
        let query_slots = query_from_context(&state);
        let query = build_search_query(&query_slots);
        let location = query_slots
            .location
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let count = query_slots.count.unwrap_or(DEFAULT_COUNT);

        let cache_key = format!("{location}|{query}|{count}");
        let places = match self.cache.get(&cache_key).await {
            Some(cached) => cached,
            None => {
                let found = self
                    .places
                    .search_places(&query, Some(&location), count)
                    .await
                    .map_err(|error| {
                        NodeError::new(format!("장소 검색 중 오류가 발생했습니다: {error}"))
                    })?;
                self.cache.put(cache_key, found.clone()).await;
                found
            }
        };

        let response = if places.is_empty() {
            format!("죄송합니다. '{query}'에 대한 검색 결과가 없습니다. 다른 조건으로 시도해보시겠어요?")
        } else {
            format!(
                "'{query}' 검색 결과입니다:\n\n{}\n\n참고: 지역 '{location}' 기준으로 찾았습니다.\n\n더 자세한 정보나 다른 장소를 알고 싶으시면 말씀해주세요.",
                format_places(&places)
            )
        };

        state.merge_context([(
            "last_search".to_string(),
            json!({
                "query": query,
                "location": location,
                "result_count": places.len(),
            }),
        )]);
        state.begin_streaming(response, CHUNK_SIZE);
        Ok(state)
    }
}

/// Build the place-search graph.
pub fn build(deps: &AgentDeps) -> Result<AgentGraph<PlaceSearchKey>> {
    use PlaceSearchKey::*;

    GraphBuilder::new(deps.validator.clone(), deps.monitor.clone())
        .add_node(AskInfo, AskInfoNode)
        .add_node(
            Search,
            SearchNode {
                places: deps.places.clone(),
                cache: deps.search_cache.clone(),
            },
        )
        .add_node(UpdateStream, StreamUpdateNode::new(CHUNK_SIZE))
        .set_entry(AskInfo)
        .add_conditional_edge(
            AskInfo,
            |state| {
                if state.next_node.as_deref() == Some("search") {
                    Step::Node(Search)
                } else {
                    Step::End
                }
            },
            vec![Step::Node(Search), Step::End],
        )
        .add_conditional_edge(
            Search,
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
