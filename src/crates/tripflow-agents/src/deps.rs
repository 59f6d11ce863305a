//! Capability bundle shared by every agent graph.

use std::sync::Arc;
use tripflow_clients::{Calendar, ItineraryStore, PlaceSearch, SearchCache, ShareLinks};
use tripflow_core::ConversationState;
use tripflow_guardrail::{ResponseMonitor, ResponseValidator};
use tripflow_llm::LlmClient;
use tripflow_session::SessionStore;

/// Everything the agent graphs need from the outside world.
///
/// Built once at startup (or per test) and cloned into each graph; all
/// members are shared handles.
#[derive(Clone)]
pub struct AgentDeps {
    pub llm: Arc<dyn LlmClient>,
    pub places: Arc<dyn PlaceSearch>,
    pub search_cache: Arc<SearchCache>,
    pub calendar: Arc<dyn Calendar>,
    pub share_links: Arc<dyn ShareLinks>,
    pub itineraries: Arc<dyn ItineraryStore>,
    pub validator: Arc<ResponseValidator>,
    pub monitor: Arc<ResponseMonitor>,
    pub sessions: Arc<dyn SessionStore<ConversationState>>,
}
