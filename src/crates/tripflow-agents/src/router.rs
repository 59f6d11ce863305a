//! Intent classification and agent routing.
//!
//! A raw utterance is matched against an **ordered** list of pattern groups;
//! the first group that matches wins, so order encodes priority - an
//! explicit end-of-conversation request pre-empts everything else:
//!
//! ```text
//! end → calendar → place search → sharing → itinerary → greeting → unknown
//! ```
//!
//! Each group is a set of regexes (any match suffices) and/or literal
//! keyword substrings (any containment suffices) over the lower-cased text.
//!
//! When no rule matches, an optional LLM fallback may classify the
//! utterance. The fallback is strictly monotonic: it is only consulted for
//! rule-level `Unknown`, so it can never override a specific rule match, and
//! a failed or unparseable model answer degrades back to `Unknown` (which
//! routes to the general conversation agent). Classification can never
//! block a turn: any internal error degrades to the conversation route.

use regex::Regex;
use std::sync::Arc;
use tripflow_core::ChatMessage;
use tripflow_llm::LlmClient;

/// Closed set of conversational goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Itinerary,
    Conversation,
    Greeting,
    PlaceSearch,
    Sharing,
    Calendar,
    End,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Itinerary => "itinerary",
            Intent::Conversation => "conversation",
            Intent::Greeting => "greeting",
            Intent::PlaceSearch => "place_search",
            Intent::Sharing => "sharing",
            Intent::Calendar => "calendar",
            Intent::End => "end",
            Intent::Unknown => "unknown",
        }
    }

    fn parse(label: &str) -> Option<Self> {
        match label {
            "itinerary" => Some(Intent::Itinerary),
            "conversation" => Some(Intent::Conversation),
            "greeting" => Some(Intent::Greeting),
            "place_search" => Some(Intent::PlaceSearch),
            "sharing" => Some(Intent::Sharing),
            "calendar" => Some(Intent::Calendar),
            "end" => Some(Intent::End),
            _ => None,
        }
    }
}

/// Which agent graph answers the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Conversation,
    Itinerary,
    PlaceSearch,
    Calendar,
    Sharing,
}

/// Routed destination: the agent plus its entry node for this intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget {
    pub agent: AgentKind,
    pub start_node: &'static str,
}

/// Fixed intent → entry-node table. Unknown intents share the conversation
/// fallback.
pub fn route_for(intent: Intent) -> RouteTarget {
    match intent {
        Intent::Itinerary => RouteTarget {
            agent: AgentKind::Itinerary,
            start_node: "ask_info",
        },
        Intent::Calendar => RouteTarget {
            agent: AgentKind::Calendar,
            start_node: "calendar",
        },
        Intent::PlaceSearch => RouteTarget {
            agent: AgentKind::PlaceSearch,
            start_node: "ask_info",
        },
        Intent::Sharing => RouteTarget {
            agent: AgentKind::Sharing,
            start_node: "sharing",
        },
        Intent::Greeting => RouteTarget {
            agent: AgentKind::Conversation,
            start_node: "greeting",
        },
        Intent::End => RouteTarget {
            agent: AgentKind::Conversation,
            start_node: "farewell",
        },
        Intent::Conversation | Intent::Unknown => RouteTarget {
            agent: AgentKind::Conversation,
            start_node: "conversation",
        },
    }
}

/// One priority group: regexes and/or keyword substrings.
struct IntentPatterns {
    regexes: Vec<Regex>,
    keywords: Vec<&'static str>,
}

impl IntentPatterns {
    fn matches(&self, text: &str) -> bool {
        self.regexes.iter().any(|r| r.is_match(text))
            || self.keywords.iter().any(|k| text.contains(k))
    }
}

/// Rule-first intent classifier with an optional LLM fallback.
pub struct IntentRouter {
    groups: Vec<(Intent, IntentPatterns)>,
    fallback_llm: Option<Arc<dyn LlmClient>>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentRouter {
    /// Rule-based classifier only.
    pub fn new() -> Self {
        let compile = |p: &str| Regex::new(p).expect("intent pattern must compile");
        let group = |regexes: Vec<Regex>, keywords: Vec<&'static str>| IntentPatterns {
            regexes,
            keywords,
        };

        let groups = vec![
            (Intent::End, group(vec![], vec!["종료", "끝", "그만"])),
            (
                Intent::Calendar,
                group(
                    vec![
                        compile(r"일정[을를]?\s*(?:추가|등록|확인|보여|조회)"),
                        compile(r"캘린더"),
                        compile(r"(?:오늘|내일|모레|이번주|이번\s*달)의?\s*일정"),
                    ],
                    vec!["약속", "미팅"],
                ),
            ),
            (
                Intent::PlaceSearch,
                group(
                    vec![compile(r"근처.+찾아"), compile(r".+(?:이|가)\s*어디")],
                    vec!["위치", "찾아줘", "검색해줘", "어디", "근처", "주변", "추천해줘"],
                ),
            ),
            (
                Intent::Sharing,
                group(
                    vec![
                        compile(r"일정\s*(?:공유|공개)"),
                        compile(r"(?:공유|공개)\s*(?:링크|url)"),
                        compile(r"(?:친구|가족|같이|동료)\s*(?:에게|한테|와|과|랑)\s*(?:공유|보여|전달)"),
                        compile(r"url\s*(?:생성|만들어|보내)"),
                        compile(r"공유\s*(?:하고 싶어|하고싶어|좀)"),
                    ],
                    vec![],
                ),
            ),
            (
                Intent::Itinerary,
                group(
                    vec![],
                    vec!["일정", "계획", "스케줄", "짜줘", "만들어", "여행", "itinerary", "travel"],
                ),
            ),
            (
                Intent::Greeting,
                group(
                    vec![compile(r"안녕|반가워|반갑습니다")],
                    vec!["hello", "hi"],
                ),
            ),
        ];

        Self {
            groups,
            fallback_llm: None,
        }
    }

    /// Enable the LLM fallback for rule-level `Unknown`.
    pub fn with_llm_fallback(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.fallback_llm = Some(llm);
        self
    }

    /// Classify an utterance. Never fails; never blocks the turn.
    pub async fn classify(&self, utterance: &str, history: &[ChatMessage]) -> (Intent, RouteTarget) {
        let intent = match self.rule_based(utterance) {
            Intent::Unknown => self.llm_fallback(utterance, history).await,
            matched => matched,
        };

        tracing::info!(intent = intent.as_str(), "classified utterance");
        (intent, route_for(intent))
    }

    /// First-matching-group-wins rule pass.
    pub fn rule_based(&self, utterance: &str) -> Intent {
        let text = utterance.to_lowercase();
        for (intent, patterns) in &self.groups {
            if patterns.matches(&text) {
                return *intent;
            }
        }
        Intent::Unknown
    }

    /// Ask the fallback model to pick a label. Anything that is not a clean
    /// known label keeps `Unknown`.
    async fn llm_fallback(&self, utterance: &str, history: &[ChatMessage]) -> Intent {
        let Some(llm) = &self.fallback_llm else {
            return Intent::Unknown;
        };

        let prompt = format!(
            "다음 사용자 메시지의 의도를 분류하세요.\n\
             가능한 의도: itinerary, conversation, greeting, place_search, sharing, calendar, end\n\
             메시지: {utterance}\n\
             의도 하나만 답하세요:"
        );

        match llm.generate(&prompt, history).await {
            Ok(answer) => {
                let answer = answer.to_lowercase();
                let parsed = Intent::parse(answer.trim())
                    .or_else(|| {
                        [
                            Intent::Itinerary,
                            Intent::PlaceSearch,
                            Intent::Sharing,
                            Intent::Calendar,
                            Intent::Greeting,
                            Intent::Conversation,
                            Intent::End,
                        ]
                        .into_iter()
                        .find(|intent| answer.contains(intent.as_str()))
                    })
                    .unwrap_or(Intent::Unknown);
                tracing::debug!(intent = parsed.as_str(), "llm fallback classification");
                parsed
            }
            Err(error) => {
                tracing::warn!(%error, "llm intent fallback failed; keeping unknown");
                Intent::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tripflow_llm::{LlmError, Result as LlmResult};

    #[test]
    fn end_preempts_itinerary_keywords() {
        let router = IntentRouter::new();
        assert_eq!(router.rule_based("여행 일정 그만둘래요"), Intent::End);
    }

    #[test]
    fn calendar_preempts_place_and_itinerary() {
        let router = IntentRouter::new();
        assert_eq!(router.rule_based("내일 일정 확인해줘"), Intent::Calendar);
        assert_eq!(router.rule_based("캘린더에 일정을 추가해줘"), Intent::Calendar);
    }

    #[test]
    fn representative_utterances_classify() {
        let router = IntentRouter::new();
        assert_eq!(router.rule_based("성수동 근처 카페 찾아줘"), Intent::PlaceSearch);
        assert_eq!(router.rule_based("일정 공유 링크 만들어줘"), Intent::Sharing);
        assert_eq!(router.rule_based("제주도 여행 계획 짜줘"), Intent::Itinerary);
        assert_eq!(router.rule_based("안녕하세요"), Intent::Greeting);
        assert_eq!(router.rule_based("오늘 기분이 어때?"), Intent::Unknown);
    }

    #[test]
    fn unknown_routes_to_conversation() {
        let target = route_for(Intent::Unknown);
        assert_eq!(target.agent, AgentKind::Conversation);
        assert_eq!(target.start_node, "conversation");
    }

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl LlmClient for FixedAnswer {
        async fn generate(&self, _prompt: &str, _history: &[ChatMessage]) -> LlmResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl LlmClient for AlwaysFails {
        async fn generate(&self, _prompt: &str, _history: &[ChatMessage]) -> LlmResult<String> {
            Err(LlmError::Provider("down".into()))
        }
    }

    #[tokio::test]
    async fn llm_fallback_only_applies_to_unknown() {
        let router = IntentRouter::new().with_llm_fallback(Arc::new(FixedAnswer("conversation")));

        // Rule match is never overridden by the model.
        let (intent, _) = router.classify("여행 일정 그만둘래요", &[]).await;
        assert_eq!(intent, Intent::End);

        // Unknown defers to the model.
        let (intent, _) = router.classify("요즘 뭐가 재밌어?", &[]).await;
        assert_eq!(intent, Intent::Conversation);
    }

    #[tokio::test]
    async fn failed_fallback_degrades_to_conversation_route() {
        let router = IntentRouter::new().with_llm_fallback(Arc::new(AlwaysFails));
        let (intent, target) = router.classify("요즘 뭐가 재밌어?", &[]).await;
        assert_eq!(intent, Intent::Unknown);
        assert_eq!(target.agent, AgentKind::Conversation);
    }

    #[tokio::test]
    async fn vague_fallback_answer_keeps_unknown() {
        let router =
            IntentRouter::new().with_llm_fallback(Arc::new(FixedAnswer("잘 모르겠습니다")));
        let (intent, _) = router.classify("무작위 텍스트", &[]).await;
        assert_eq!(intent, Intent::Unknown);
    }
}
