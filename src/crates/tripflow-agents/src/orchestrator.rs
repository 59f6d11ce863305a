//! Top-level message orchestration.
//!
//! One [`Orchestrator`] owns the intent router and the five agent runtimes
//! over a shared session store. `handle_message` is the whole turn protocol
//! from the hosting layer's point of view: classify, pick the agent, stream
//! the walk.

use crate::deps::AgentDeps;
use crate::graphs;
use crate::router::{AgentKind, IntentRouter};
use futures::stream::BoxStream;
use std::sync::Arc;
use tripflow_core::{
    AgentRuntime, ChatMessage, ConversationState, Result, TurnRequest, TurnUpdate, WalkOptions,
};
use tripflow_session::SessionStore;

/// The multi-agent dialogue service.
pub struct Orchestrator {
    router: IntentRouter,
    sessions: Arc<dyn SessionStore<ConversationState>>,
    base_url: Option<String>,
    conversation: AgentRuntime<graphs::conversation::ConversationKey>,
    itinerary: AgentRuntime<graphs::itinerary::ItineraryKey>,
    place_search: AgentRuntime<graphs::place_search::PlaceSearchKey>,
    calendar: AgentRuntime<graphs::calendar::CalendarKey>,
    sharing: AgentRuntime<graphs::sharing::SharingKey>,
}

impl Orchestrator {
    /// Build all five graphs with default walk options (1s streaming
    /// pacing).
    pub fn new(deps: AgentDeps) -> Result<Self> {
        Self::with_options(deps, WalkOptions::default())
    }

    /// Build with explicit walk options (tests pass zero pacing).
    pub fn with_options(deps: AgentDeps, options: WalkOptions) -> Result<Self> {
        let sessions = deps.sessions.clone();

        Ok(Self {
            router: IntentRouter::new().with_llm_fallback(deps.llm.clone()),
            base_url: None,
            conversation: AgentRuntime::new(graphs::conversation::build(&deps)?, sessions.clone())
                .with_options(options.clone()),
            itinerary: AgentRuntime::new(graphs::itinerary::build(&deps)?, sessions.clone())
                .with_options(options.clone()),
            place_search: AgentRuntime::new(graphs::place_search::build(&deps)?, sessions.clone())
                .with_options(options.clone()),
            calendar: AgentRuntime::new(graphs::calendar::build(&deps)?, sessions.clone())
                .with_options(options.clone()),
            sharing: AgentRuntime::new(graphs::sharing::build(&deps)?, sessions.clone())
                .with_options(options),
            sessions,
        })
    }

    /// Base URL stamped into every turn (absolute share links).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Rule-only classification (no LLM fallback); useful for hosts that
    /// want deterministic routing.
    pub fn without_llm_routing(mut self) -> Self {
        self.router = IntentRouter::new();
        self
    }

    /// Process one user message: classify the intent, route to the matching
    /// agent graph, and stream snapshots until the turn completes.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        history: Vec<ChatMessage>,
    ) -> BoxStream<'static, Result<TurnUpdate>> {
        // Classification sees the checkpointed transcript when one exists;
        // for a fresh session the caller-supplied history is all there is.
        let transcript = match self.sessions.get_state(session_id).await {
            Ok(Some(state)) => state.messages,
            _ => history.clone(),
        };

        let (intent, target) = self.router.classify(message, &transcript).await;
        tracing::info!(
            session_id,
            intent = intent.as_str(),
            agent = ?target.agent,
            start_node = target.start_node,
            "routing turn"
        );

        let mut request = TurnRequest::new(session_id, message);
        request.start_node = Some(target.start_node.to_string());
        request.intent = Some(intent.as_str().to_string());
        request.history = history;
        request.base_url = self.base_url.clone();

        match target.agent {
            AgentKind::Conversation => Box::pin(self.conversation.process(request)),
            AgentKind::Itinerary => Box::pin(self.itinerary.process(request)),
            AgentKind::PlaceSearch => Box::pin(self.place_search.process(request)),
            AgentKind::Calendar => Box::pin(self.calendar.process(request)),
            AgentKind::Sharing => Box::pin(self.sharing.process(request)),
        }
    }
}
