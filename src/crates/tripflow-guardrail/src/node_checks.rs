//! Node-specific post-validation nudges.
//!
//! After the generic passes in [`crate::validator`], a few node kinds get a
//! best-effort contextual check. These only ever append an advisory
//! sentence - they cannot fail a turn or remove content.

/// Apply the post-check for the named node to already-validated text.
///
/// Unknown node names pass through unchanged.
pub fn apply_node_checks(node_name: &str, text: String) -> String {
    match node_name {
        "sharing" => check_sharing(text),
        "generate" | "list" => check_itinerary(text),
        "calendar" => check_calendar(text),
        _ => text,
    }
}

/// A sharing response that talks about a share link but contains none gets a
/// retry caution.
fn check_sharing(mut text: String) -> String {
    if text.contains("공유 링크") && !text.contains("http") {
        tracing::warn!("sharing response mentions a share link but contains no URL");
        text.push_str("\n\n(공유 링크가 생성되지 않았습니다. 나중에 다시 시도해주세요.)");
    }
    text
}

/// An itinerary response without day-by-day structure invites the user to
/// provide more detail.
fn check_itinerary(mut text: String) -> String {
    if text.contains("일정") && !text.contains("일차") {
        tracing::warn!("itinerary response has no per-day breakdown");
        text.push_str("\n\n(더 자세한 일정을 원하시면 추가 정보를 제공해주세요.)");
    }
    text
}

/// A calendar response that mentions registration without confirming success
/// gets a verification caution.
fn check_calendar(mut text: String) -> String {
    if text.contains("캘린더") && text.contains("등록") && !text.contains("성공") {
        tracing::warn!("calendar registration outcome is unclear");
        text.push_str("\n\n(캘린더 등록 상태를 확인해주세요.)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharing_without_url_gets_caution() {
        let out = apply_node_checks("sharing", "공유 링크를 만들었습니다".to_string());
        assert!(out.contains("나중에 다시 시도해주세요"));
    }

    #[test]
    fn sharing_with_url_is_untouched() {
        let text = "공유 링크: https://tripflow.com/share/abc".to_string();
        assert_eq!(apply_node_checks("sharing", text.clone()), text);
    }

    #[test]
    fn itinerary_without_day_numbers_gets_prompt() {
        let out = apply_node_checks("generate", "서울 일정을 추천드립니다".to_string());
        assert!(out.contains("더 자세한 일정"));
    }

    #[test]
    fn calendar_without_success_gets_caution() {
        let out = apply_node_checks("calendar", "캘린더에 등록 요청을 보냈습니다".to_string());
        assert!(out.ends_with("(캘린더 등록 상태를 확인해주세요.)"));
    }

    #[test]
    fn unknown_node_passes_through() {
        let text = "안녕하세요".to_string();
        assert_eq!(apply_node_checks("greeting", text.clone()), text);
    }
}
