//! System prompt templates.
//!
//! Templates are plain strings with `{name}` placeholders filled by
//! [`render`]. Wording lives here, in one place, so the nodes stay about
//! control flow.

/// Shared persona for conversational turns.
pub const CONVERSATION_SYSTEM: &str = "당신은 여행 일정 전문 AI 에이전트입니다. \
사용자와 자연스럽게 대화하며 여행 준비를 돕습니다. \
확인되지 않은 가격, 연락처, 영업시간은 단정적으로 말하지 마세요.";

/// Greeting turns add a warmth nudge.
pub const GREETING_SYSTEM: &str = "당신은 여행 일정 전문 AI 에이전트입니다. \
처음 인사하는 사용자를 환영하고, 어떤 여행을 도와줄 수 있는지 간단히 소개하세요.";

/// Task framing for the itinerary tool loop. Placeholders: `{tools}`,
/// `{tool_names}`.
pub const ITINERARY_SYSTEM: &str = "당신은 여행 일정 전문 AI 에이전트입니다. \
아래 도구를 사용해 여행 일정을 계획하세요.\n\n\
사용 가능한 도구:\n{tools}\n\
도구 이름: {tool_names}\n\n\
도구를 사용하려면 정확히 다음 형식으로 답하세요:\n\
Action: <도구 이름>\n\
Action Input: <입력>\n\n\
최종 일정이 준비되면 다음 형식으로 답하세요:\n\
Action: FinalAnswer\n\
Action Input: <일차별 여행 일정>";

/// Fill `{name}` placeholders.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = template.to_string();
    for (name, value) in values {
        output = output.replace(&format!("{{{name}}}"), value);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_placeholders() {
        let rendered = render("{a} 그리고 {b}, 다시 {a}", &[("a", "하나"), ("b", "둘")]);
        assert_eq!(rendered, "하나 그리고 둘, 다시 하나");
    }

    #[test]
    fn itinerary_template_lists_tools() {
        let rendered = render(
            ITINERARY_SYSTEM,
            &[("tools", "place_search: 장소 검색"), ("tool_names", "place_search")],
        );
        assert!(rendered.contains("place_search: 장소 검색"));
        assert!(!rendered.contains("{tools}"));
    }
}
