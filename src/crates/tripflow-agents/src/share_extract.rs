//! Share-request extraction and validation.

use regex::Regex;
use std::sync::OnceLock;
use tripflow_clients::sharing::ShareType;

/// How the user wants the link delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMethod {
    Url,
    Kakao,
    Email,
    Sms,
}

impl ShareMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareMethod::Url => "URL",
            ShareMethod::Kakao => "KAKAO",
            ShareMethod::Email => "EMAIL",
            ShareMethod::Sms => "SMS",
        }
    }

    /// Delivery sentence appended to the sharing response.
    pub fn response_sentence(&self) -> &'static str {
        match self {
            ShareMethod::Kakao => " 카카오톡으로 친구들에게 공유할 수 있습니다.",
            ShareMethod::Email => " 이메일로 공유할 수 있습니다.",
            ShareMethod::Sms => " 문자 메시지로 공유할 수 있습니다.",
            ShareMethod::Url => " 이 링크를 통해 다른 사람들과 여행 일정을 공유할 수 있습니다.",
        }
    }
}

/// A recognized share request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareRequest {
    pub share_type: ShareType,
    /// Link validity in days, clamped to 1..=30.
    pub days: u32,
    pub method: ShareMethod,
    /// Itinerary ids named in the utterance (`id가 3, 4`).
    pub itinerary_ids: Vec<i64>,
}

impl Default for ShareRequest {
    fn default() -> Self {
        Self {
            share_type: ShareType::View,
            days: 7,
            method: ShareMethod::Url,
            itinerary_ids: Vec::new(),
        }
    }
}

struct SharePatterns {
    requests: Vec<Regex>,
    edit: Regex,
    days: Regex,
    ids: Regex,
    kakao: Regex,
    email: Regex,
    sms: Regex,
}

fn patterns() -> &'static SharePatterns {
    static PATTERNS: OnceLock<SharePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("share pattern must compile");
        SharePatterns {
            requests: vec![
                compile(r"일정\s*(?:공유|공개)"),
                compile(r"(?:공유|공개)\s*(?:링크|URL|url)"),
                compile(r"(?:친구|가족|같이|동료)\s*(?:에게|한테|와|과|랑)\s*(?:공유|보여|전달)"),
                compile(r"(?:url|URL)\s*(?:생성|만들어|보내)"),
                compile(r"공유\s*(?:하고 싶어|하고싶어|좀|해줘|해 줘)"),
                compile(r"링크\s*(?:만들어|생성|보내|줘|주세요)"),
                compile(r"(?:카톡|카카오톡|메일|이메일|문자)\s*(?:으로|로)?\s*(?:공유|보내|전송|전달)"),
            ],
            edit: compile(r"(?:수정|편집|변경|업데이트)\s*(?:가능|할 수|허용|권한)"),
            days: compile(r"(\d{1,3})\s*(?:일|날짜|기간|day)"),
            ids: compile(r"id가\s*(\d+(?:\s*,\s*\d+)*)"),
            kakao: compile(r"카톡|카카오톡"),
            email: compile(r"메일|이메일|email"),
            sms: compile(r"문자|SMS|sms|메시지"),
        }
    })
}

/// Itinerary ids named as `id가 3, 4` in an utterance.
pub fn extract_itinerary_ids(text: &str) -> Vec<i64> {
    patterns()
        .ids
        .captures(text)
        .map(|captures| {
            captures[1]
                .split(',')
                .filter_map(|raw| raw.trim().parse::<i64>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Recognize a share request in the utterance. `None` means the text does
/// not ask for sharing at all.
pub fn extract_share_request(text: &str) -> Option<ShareRequest> {
    let patterns = patterns();
    let matched = patterns.requests.iter().find_map(|p| p.find(text))?;
    tracing::info!(pattern = matched.as_str(), "share request detected");

    let share_type = if patterns.edit.is_match(text) {
        ShareType::Edit
    } else {
        ShareType::View
    };

    // A bare `일` right before `정` is the first syllable of 일정, not a
    // day count.
    let days = patterns
        .days
        .captures_iter(text)
        .filter(|captures| {
            let end = captures.get(0).expect("whole match").end();
            !text[end..].starts_with('정')
        })
        .find_map(|captures| captures[1].parse::<u32>().ok())
        .map(|days| days.clamp(1, 30))
        .unwrap_or(7);

    let method = if patterns.kakao.is_match(text) {
        ShareMethod::Kakao
    } else if patterns.email.is_match(text) {
        ShareMethod::Email
    } else if patterns.sms.is_match(text) {
        ShareMethod::Sms
    } else {
        ShareMethod::Url
    };

    Some(ShareRequest {
        share_type,
        days,
        method,
        itinerary_ids: extract_itinerary_ids(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_share_request_gets_defaults() {
        let request = extract_share_request("일정 공유해줘").unwrap();
        assert_eq!(request, ShareRequest::default());
    }

    #[test]
    fn edit_days_method_and_ids_are_extracted() {
        let request =
            extract_share_request("id가 3, 4 일정을 편집 가능하게 14일 동안 카톡으로 공유해줘")
                .unwrap();
        assert_eq!(request.share_type, ShareType::Edit);
        assert_eq!(request.days, 14);
        assert_eq!(request.method, ShareMethod::Kakao);
        assert_eq!(request.itinerary_ids, vec![3, 4]);
    }

    #[test]
    fn days_are_clamped() {
        let request = extract_share_request("일정 공유 링크 90일 동안 유지해줘").unwrap();
        assert_eq!(request.days, 30);
    }

    #[test]
    fn day_count_is_not_confused_with_iljeong() {
        let request = extract_share_request("id가 1 일정 공유해줘").unwrap();
        assert_eq!(request.days, 7);
        assert_eq!(request.itinerary_ids, vec![1]);
    }

    #[test]
    fn non_share_text_is_none() {
        assert_eq!(extract_share_request("서울 여행 일정 짜줘"), None);
    }
}
