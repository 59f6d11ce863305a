//! End-to-end turns through the orchestrator with scripted capabilities.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tripflow_agents::{AgentDeps, Orchestrator};
use tripflow_clients::{
    Calendar, CalendarEventRef, ClientError, InMemoryItineraryStore, Itinerary, ItineraryStore,
    LocalShareLinks, Place, PlaceSearch, Result as ClientResult, SearchCache,
};
use tripflow_core::{ConversationState, Role, TurnUpdate, WalkOptions};
use tripflow_guardrail::{ResponseMonitor, ResponseValidator};
use tripflow_llm::{LlmClient, Result as LlmResult};
use tripflow_session::InMemorySessionStore;

struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new<I: IntoIterator<Item = S>, S: Into<String>>(responses: I) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        _prompt: &str,
        _history: &[tripflow_core::ChatMessage],
    ) -> LlmResult<String> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "네, 도와드릴게요.".to_string()))
    }
}

struct StubPlaces;

#[async_trait]
impl PlaceSearch for StubPlaces {
    async fn search_places(
        &self,
        query: &str,
        _location: Option<&str>,
        _size: usize,
    ) -> ClientResult<Vec<Place>> {
        Ok(vec![Place {
            name: format!("{query} 명소"),
            category: "카페".into(),
            address: "서울 성동구 성수동".into(),
            road_address: None,
            phone: None,
            url: None,
        }])
    }
}

struct OkCalendar;

#[async_trait]
impl Calendar for OkCalendar {
    async fn add_itinerary(&self, _itinerary: &Itinerary) -> ClientResult<CalendarEventRef> {
        Ok(CalendarEventRef {
            event_id: "evt-1".into(),
            html_link: None,
        })
    }
}

struct DownCalendar;

#[async_trait]
impl Calendar for DownCalendar {
    async fn add_itinerary(&self, _itinerary: &Itinerary) -> ClientResult<CalendarEventRef> {
        Err(ClientError::Provider {
            status: 503,
            message: "calendar unavailable".into(),
        })
    }
}

struct Fixture {
    orchestrator: Orchestrator,
    itineraries: Arc<InMemoryItineraryStore>,
}

fn fixture(llm: Arc<dyn LlmClient>, calendar: Arc<dyn Calendar>) -> Fixture {
    let itineraries = Arc::new(InMemoryItineraryStore::new());
    let deps = AgentDeps {
        llm,
        places: Arc::new(StubPlaces),
        search_cache: Arc::new(SearchCache::new()),
        calendar,
        share_links: Arc::new(LocalShareLinks::new("https://tripflow.com")),
        itineraries: itineraries.clone(),
        validator: Arc::new(ResponseValidator::new()),
        monitor: Arc::new(ResponseMonitor::new()),
        sessions: Arc::new(InMemorySessionStore::<ConversationState>::new()),
    };

    let orchestrator = Orchestrator::with_options(
        deps,
        WalkOptions {
            pacing: Duration::ZERO,
            ..WalkOptions::default()
        },
    )
    .unwrap()
    .without_llm_routing();

    Fixture {
        orchestrator,
        itineraries,
    }
}

async fn run_turn(fixture: &Fixture, session: &str, message: &str) -> Vec<TurnUpdate> {
    fixture
        .orchestrator
        .handle_message(session, message, Vec::new())
        .await
        .map(|item| item.expect("turn update"))
        .collect()
        .await
}

async fn seed_itinerary(fixture: &Fixture, title: &str) -> i64 {
    fixture
        .itineraries
        .save(Itinerary {
            id: 0,
            user_id: 1,
            title: title.to_string(),
            destination: "서울".into(),
            date: "2025-05-01".parse().unwrap(),
            content: "1일차: 경복궁".into(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn greeting_turn_streams_partial_then_complete() {
    let text = "안녕하세요! 여행 일정을 도와드리는 에이전트입니다. 어디로 떠나고 싶으신가요? 지역과 기간을 알려주시면 일정을 만들어드릴게요.";
    let fixture = fixture(ScriptedLlm::new([text]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-greet", "안녕하세요").await;

    assert!(updates.len() > 2, "expected streamed partial updates");
    assert!(!updates[0].is_final());
    let positions: Vec<usize> = updates
        .iter()
        .filter_map(|u| u.streaming.as_ref().map(|c| c.current_position))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));

    let last = updates.last().unwrap();
    assert!(last.is_final());
    assert_eq!(last.intent.as_deref(), Some("greeting"));
    assert_eq!(last.messages.len(), 2);
    assert_eq!(last.messages[1].role, Role::Assistant);
    assert_eq!(last.messages[1].content, text);
}

#[tokio::test]
async fn llm_prices_are_softened_before_the_client_sees_them() {
    let fixture = fixture(
        ScriptedLlm::new(["이 식당은 10,000원 입니다"]),
        Arc::new(OkCalendar),
    );

    let updates = run_turn(&fixture, "s-price", "밥값 얼마나 들까").await;
    let last = updates.last().unwrap();
    assert!(last.response.as_deref().unwrap().contains("약 10,000원"));
    assert!(last.messages[1].content.contains("약 10,000원"));
}

#[tokio::test]
async fn itinerary_without_slots_asks_for_them() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-ask", "여행 일정 짜줘").await;
    let last = updates.last().unwrap();
    assert_eq!(last.intent.as_deref(), Some("itinerary"));
    assert!(last.response.as_deref().unwrap().contains("정보가 필요합니다"));
    assert!(last.error.is_none());
}

#[tokio::test]
async fn itinerary_generates_with_tools_once_slots_are_known() {
    let fixture = fixture(
        ScriptedLlm::new([
            "Action: place_search\nAction Input: 서울 관광지",
            "Action: FinalAnswer\nAction Input: 1일차: 경복궁과 북촌 한옥마을\n2일차: 성수동 카페 거리",
        ]),
        Arc::new(OkCalendar),
    );

    let updates = run_turn(&fixture, "s-gen", "서울지역 2박 3일 여행 일정 짜줘").await;
    let last = updates.last().unwrap();
    assert!(last.error.is_none());
    let response = last.response.as_deref().unwrap();
    assert!(response.contains("1일차"));
    assert!(response.contains("2일차"));
    assert_eq!(
        last.context.get("destination").and_then(|v| v.as_str()),
        Some("서울")
    );
}

#[tokio::test]
async fn repeated_tool_calls_end_the_itinerary_turn() {
    let fixture = fixture(
        ScriptedLlm::new([
            "Action: place_search\nAction Input: 서울 관광지",
            "Action: place_search\nAction Input: 서울  관광지",
            "Action: FinalAnswer\nAction Input: 도달 불가",
        ]),
        Arc::new(OkCalendar),
    );

    let updates = run_turn(&fixture, "s-loop", "서울지역 2박 3일 여행 일정 짜줘").await;
    let response = updates.last().unwrap().response.clone().unwrap();
    assert!(response.contains("동일한 도구를 반복해서 사용하여 일정을 종료합니다."));
}

#[tokio::test]
async fn calendar_without_ids_is_recoverable() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-cal", "캘린더에 넣어줘").await;
    let last = updates.last().unwrap();
    assert_eq!(last.intent.as_deref(), Some("calendar"));
    assert!(last.error.is_none());
    assert!(last.response.as_deref().unwrap().contains("일정을 먼저 생성해주세요"));
}

#[tokio::test]
async fn calendar_capability_failure_is_fatal_but_shaped() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(DownCalendar));
    let id = seed_itinerary(&fixture, "서울 여행").await;

    let updates = run_turn(&fixture, "s-cal-down", &format!("id가 {id} 일정을 캘린더에 등록해줘")).await;
    let last = updates.last().unwrap();

    assert!(last.error.is_some(), "calendar failure must surface");
    let response = last.response.as_deref().unwrap();
    assert!(response.starts_with("[calendar 오류]"));
    assert!(response.contains("캘린더 등록 실패"));
    // The error is an assistant message, not a crash.
    assert_eq!(last.messages.last().unwrap().role, Role::Assistant);
}

#[tokio::test]
async fn calendar_registers_seeded_itinerary() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));
    let id = seed_itinerary(&fixture, "서울 여행").await;

    let updates = run_turn(&fixture, "s-cal-ok", &format!("id가 {id} 일정을 캘린더에 등록해줘")).await;
    let last = updates.last().unwrap();
    assert!(last.error.is_none());
    assert!(last.response.as_deref().unwrap().contains("캘린더에 추가되었습니다"));
}

#[tokio::test]
async fn sharing_without_itinerary_is_recoverable() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-share-none", "일정 공유해줘").await;
    let last = updates.last().unwrap();
    assert_eq!(last.intent.as_deref(), Some("sharing"));
    assert!(last.error.is_none());
    assert!(last.response.as_deref().unwrap().contains("일정을 먼저 생성해주세요"));
}

#[tokio::test]
async fn sharing_creates_a_link_for_a_named_itinerary() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));
    let id = seed_itinerary(&fixture, "서울 여행").await;

    let updates = run_turn(&fixture, "s-share", &format!("id가 {id} 일정 공유해줘")).await;
    let last = updates.last().unwrap();
    assert!(last.error.is_none());

    let response = last.response.as_deref().unwrap();
    assert!(response.contains("공유 링크"));
    assert!(response.contains("https://tripflow.com/share/"));

    let share_info = last.context.get("share_info").unwrap();
    assert_eq!(share_info["status"], "success");
    assert_eq!(share_info["days"], 7);
}

#[tokio::test]
async fn place_search_turn_formats_results() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-place", "성수동에서 카페 3곳 찾아줘").await;
    let last = updates.last().unwrap();
    assert_eq!(last.intent.as_deref(), Some("place_search"));
    assert!(last.error.is_none());

    let response = last.response.as_deref().unwrap();
    assert!(response.contains("검색 결과입니다"));
    assert!(response.contains("성수동"));

    let search = last.context.get("last_search").unwrap();
    assert_eq!(search["location"], "성수동");
    assert_eq!(search["result_count"], 1);
}

#[tokio::test]
async fn place_search_slots_persist_across_turns() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    // Turn 1: category only - the agent asks for the region.
    let updates = run_turn(&fixture, "s-follow", "카페 찾아줘").await;
    assert!(updates
        .last()
        .unwrap()
        .response
        .as_deref()
        .unwrap()
        .contains("알려주실 수 있나요"));

    // Turn 2: region only - the stored category completes the query.
    let updates = run_turn(&fixture, "s-follow", "성수동에서 찾아줘").await;
    let last = updates.last().unwrap();
    assert!(last.response.as_deref().unwrap().contains("검색 결과입니다"));
    assert_eq!(
        last.context.get("category").and_then(|v| v.as_str()),
        Some("카페")
    );
}

#[tokio::test]
async fn transcript_accumulates_across_agents() {
    let fixture = fixture(
        ScriptedLlm::new(["반가워요! 어떤 여행을 도와드릴까요?"]),
        Arc::new(OkCalendar),
    );

    run_turn(&fixture, "s-multi", "안녕하세요").await;
    let updates = run_turn(&fixture, "s-multi", "여행 일정 짜줘").await;

    let last = updates.last().unwrap();
    // greeting user+assistant, then itinerary user+assistant.
    assert_eq!(last.messages.len(), 4);
    assert_eq!(last.messages[0].content, "안녕하세요");
    assert_eq!(last.messages[2].content, "여행 일정 짜줘");
}

#[tokio::test]
async fn end_intent_preempts_and_says_goodbye() {
    let fixture = fixture(ScriptedLlm::new::<[&str; 0], &str>([]), Arc::new(OkCalendar));

    let updates = run_turn(&fixture, "s-end", "여행 일정 그만둘래요").await;
    let last = updates.last().unwrap();
    assert_eq!(last.intent.as_deref(), Some("end"));
    assert!(last.response.as_deref().unwrap().contains("대화를 종료합니다"));
}
