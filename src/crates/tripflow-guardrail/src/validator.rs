//! Guardrail text validation passes.
//!
//! [`ResponseValidator::validate`] runs five passes unconditionally and
//! cumulatively over assistant-authored text:
//!
//! 1. **URL allow-listing** - URLs whose host is not on the allow-list are
//!    replaced with `[확인되지 않은 링크]`.
//! 2. **Price softening** - absolute currency amounts not already qualified
//!    by an approximation word are prefixed with `약 `.
//! 3. **Time softening** - explicit operating-hours ranges without a hedging
//!    word are prefixed with `일반적으로 `.
//! 4. **Contact scrubbing** - phone numbers become `[연락처 확인 필요]`,
//!    emails outside the allow-listed domains become `[이메일 확인 필요]`.
//! 5. **Confidence flagging** - definitive adverbs (`반드시`, `무조건`, ...)
//!    are reported but never rewritten.
//!
//! Text containing none of these patterns is returned unchanged with zero
//! issues, and already-softened prices/hours are not softened again, so the
//! whole pipeline is idempotent.

use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// Hosts a response is allowed to link to without verification.
const ALLOWED_URL_DOMAINS: &[&str] = &[
    "tripflow.com",
    "localhost",
    "kakao.com",
    "google.com",
    "maps.google.com",
];

/// Email domains that are not treated as fabricated.
const ALLOWED_EMAIL_DOMAINS: &[&str] = &["tripflow.com", "kakao.com", "google.com"];

/// Words that mark a price or time expression as already approximate.
const APPROXIMATION_WORDS: &[&str] = &["약", "대략", "보통"];

/// Words that mark an operating-hours expression as already hedged.
const TIME_HEDGE_WORDS: &[&str] = &["보통", "일반적으로", "대개", "대부분", "약", "주로"];

const UNVERIFIED_LINK_TOKEN: &str = "[확인되지 않은 링크]";
const CONTACT_TOKEN: &str = "[연락처 확인 필요]";
const EMAIL_TOKEN: &str = "[이메일 확인 필요]";

/// Classification of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// URL with a host outside the allow-list.
    UnverifiedUrl,
    /// Absolute price stated without an approximation word.
    AbsolutePrice,
    /// Exact operating hours stated without a hedge.
    AbsoluteTime,
    /// Phone number or unknown-domain email address.
    FabricatedContact,
    /// Definitive/overclaiming phrasing (detection only).
    DefinitiveLanguage,
}

/// One finding produced by a validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    /// Which pass produced the finding.
    pub kind: IssueKind,
    /// Human-readable description of what was found and what was done.
    pub detail: String,
}

/// Result of running the full validation pipeline.
#[derive(Debug, Clone)]
pub struct Validated {
    /// The (possibly rewritten) text.
    pub text: String,
    /// Every finding, across all passes, in pass order.
    pub issues: Vec<Issue>,
}

impl Validated {
    /// True when no pass changed or flagged anything.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Deterministic text sanitizer applied to every assistant response.
///
/// Compile once, share behind an `Arc`. All methods take `&self`.
pub struct ResponseValidator {
    url: Regex,
    prices: Vec<Regex>,
    times: Vec<Regex>,
    phones: Vec<Regex>,
    email: Regex,
    definitive: Vec<Regex>,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseValidator {
    /// Compile the pattern battery.
    pub fn new() -> Self {
        let compile = |p: &str| Regex::new(p).expect("guardrail pattern must compile");

        Self {
            url: compile(r"https?://(?:[-A-Za-z0-9.]|%[0-9A-Fa-f]{2})+"),
            prices: vec![
                compile(r"\d{1,3}(?:,\d{3})+원"),
                compile(r"\d+만원"),
                compile(r"\d+원"),
                compile(r"₩\d{1,3}(?:,\d{3})*"),
                compile(r"\$\d{1,3}(?:,\d{3})*"),
            ],
            times: vec![
                compile(r"영업시간[은는이가]?\s*\d{1,2}:\d{2}\s*~\s*\d{1,2}:\d{2}"),
                compile(r"운영시간[은는이가]?\s*\d{1,2}:\d{2}\s*~\s*\d{1,2}:\d{2}"),
                compile(r"개장시간[은는이가]?\s*\d{1,2}:\d{2}\s*~\s*\d{1,2}:\d{2}"),
                compile(r"\d{1,2}:\d{2}\s*~\s*\d{1,2}:\d{2}\s*까지\s*영업"),
                compile(r"\d{1,2}:\d{2}\s*부터\s*\d{1,2}:\d{2}\s*까지"),
            ],
            phones: vec![
                compile(r"010-\d{4}-\d{4}"),
                compile(r"02-\d{3,4}-\d{4}"),
                compile(r"0\d{1,2}-\d{3,4}-\d{4}"),
                compile(r"\+82[ -]?\d{1,2}[ -]?\d{3,4}[ -]?\d{4}"),
            ],
            email: compile(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
            definitive: vec![
                compile(r"반드시"),
                compile(r"무조건"),
                compile(r"항상"),
                compile(r"절대"),
                compile(r"확실히"),
                compile(r"틀림없이"),
                compile(r"확정적으로"),
                compile(r"예외 없이"),
                compile(r"오직"),
                compile(r"유일하게"),
                compile(r"100%"),
            ],
        }
    }

    /// Run all five passes in order and collect every finding.
    pub fn validate(&self, text: &str) -> Validated {
        let mut issues = Vec::new();

        let (text, mut found) = self.validate_urls(text);
        issues.append(&mut found);

        let (text, mut found) = self.validate_prices(&text);
        issues.append(&mut found);

        let (text, mut found) = self.validate_times(&text);
        issues.append(&mut found);

        let (text, mut found) = self.scrub_contacts(&text);
        issues.append(&mut found);

        issues.extend(self.flag_definitive_language(&text));

        if issues.is_empty() {
            tracing::debug!("response validation passed with no findings");
        } else {
            tracing::warn!(count = issues.len(), "response validation found issues");
            for issue in &issues {
                tracing::warn!(kind = ?issue.kind, "{}", issue.detail);
            }
        }

        Validated { text, issues }
    }

    /// Replace URLs whose host is not on the allow-list.
    pub fn validate_urls(&self, text: &str) -> (String, Vec<Issue>) {
        let mut issues = Vec::new();
        let mut spans = Vec::new();

        for m in self.url.find_iter(text) {
            let allowed = ALLOWED_URL_DOMAINS.iter().any(|d| m.as_str().contains(d));
            if !allowed {
                issues.push(Issue {
                    kind: IssueKind::UnverifiedUrl,
                    detail: format!("허용되지 않은 URL 발견: {}", m.as_str()),
                });
                spans.push((m.range(), UNVERIFIED_LINK_TOKEN.to_string()));
            }
        }

        (replace_spans(text, spans), issues)
    }

    /// Prefix unqualified absolute prices with `약 `.
    pub fn validate_prices(&self, text: &str) -> (String, Vec<Issue>) {
        let mut issues = Vec::new();
        let mut spans = Vec::new();

        for range in non_overlapping_matches(&self.prices, text) {
            let matched = &text[range.clone()];
            if preceded_by_word(text, range.start, APPROXIMATION_WORDS) {
                continue;
            }
            let replacement = format!("약 {matched}");
            issues.push(Issue {
                kind: IssueKind::AbsolutePrice,
                detail: format!("정확한 가격 정보를 근사 표현으로 변경: {matched} → {replacement}"),
            });
            spans.push((range, replacement));
        }

        (replace_spans(text, spans), issues)
    }

    /// Prefix unhedged operating-hours expressions with `일반적으로 `.
    pub fn validate_times(&self, text: &str) -> (String, Vec<Issue>) {
        let mut issues = Vec::new();
        let mut spans = Vec::new();

        for range in non_overlapping_matches(&self.times, text) {
            let matched = &text[range.clone()];
            let hedged = TIME_HEDGE_WORDS.iter().any(|w| matched.contains(w))
                || preceded_by_word(text, range.start, TIME_HEDGE_WORDS);
            if hedged {
                continue;
            }
            let replacement = format!("일반적으로 {matched}");
            issues.push(Issue {
                kind: IssueKind::AbsoluteTime,
                detail: format!("정확한 운영시간 표현을 완화: {matched} → {replacement}"),
            });
            spans.push((range, replacement));
        }

        (replace_spans(text, spans), issues)
    }

    /// Replace phone numbers and unknown-domain emails with placeholders.
    pub fn scrub_contacts(&self, text: &str) -> (String, Vec<Issue>) {
        let mut issues = Vec::new();
        let mut spans = Vec::new();

        for range in non_overlapping_matches(&self.phones, text) {
            // The regex crate has no lookbehind; reject matches glued to
            // surrounding digits here instead.
            if adjacent_digit(text, &range) {
                continue;
            }
            let matched = &text[range.clone()];
            issues.push(Issue {
                kind: IssueKind::FabricatedContact,
                detail: format!("임의 생성된 전화번호 제거: {matched}"),
            });
            spans.push((range, CONTACT_TOKEN.to_string()));
        }

        let phones_scrubbed = replace_spans(text, spans);

        let mut spans = Vec::new();
        for m in self.email.find_iter(&phones_scrubbed) {
            let allowed = ALLOWED_EMAIL_DOMAINS.iter().any(|d| m.as_str().contains(d));
            if !allowed {
                issues.push(Issue {
                    kind: IssueKind::FabricatedContact,
                    detail: format!("임의 생성된 이메일 제거: {}", m.as_str()),
                });
                spans.push((m.range(), EMAIL_TOKEN.to_string()));
            }
        }

        (replace_spans(&phones_scrubbed, spans), issues)
    }

    /// Report definitive phrasing with surrounding context. Never rewrites.
    pub fn flag_definitive_language(&self, text: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        for pattern in &self.definitive {
            for m in pattern.find_iter(text) {
                issues.push(Issue {
                    kind: IssueKind::DefinitiveLanguage,
                    detail: format!(
                        "확정적 주장 발견: '{}' 부분에서 '{}' 표현 사용",
                        char_context(text, m.start(), m.end(), 20),
                        m.as_str()
                    ),
                });
            }
        }
        issues
    }
}

/// Collect matches across several patterns, dropping any match that overlaps
/// an earlier (or longer) one so broad and narrow patterns never double-edit
/// the same span.
fn non_overlapping_matches(patterns: &[Regex], text: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for pattern in patterns {
        for m in pattern.find_iter(text) {
            let candidate = m.range();
            let overlaps = ranges
                .iter()
                .any(|r| candidate.start < r.end && r.start < candidate.end);
            if !overlaps {
                ranges.push(candidate);
            }
        }
    }
    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Apply `(range, replacement)` edits back-to-front so earlier byte offsets
/// stay valid.
fn replace_spans(text: &str, mut spans: Vec<(Range<usize>, String)>) -> String {
    spans.sort_by_key(|(r, _)| r.start);
    let mut result = text.to_string();
    for (range, replacement) in spans.into_iter().rev() {
        result.replace_range(range, &replacement);
    }
    result
}

/// True when the text immediately before `start` ends with one of `words`
/// (ignoring trailing whitespace).
fn preceded_by_word(text: &str, start: usize, words: &[&str]) -> bool {
    let prefix = text[..start].trim_end();
    words.iter().any(|w| prefix.ends_with(w))
}

/// True when the byte right before or after the range is an ASCII digit.
fn adjacent_digit(text: &str, range: &Range<usize>) -> bool {
    let before = text[..range.start].chars().next_back();
    let after = text[range.end..].chars().next();
    matches!(before, Some(c) if c.is_ascii_digit()) || matches!(after, Some(c) if c.is_ascii_digit())
}

/// Up to `radius` characters of context on each side of a match.
fn char_context(text: &str, start: usize, end: usize, radius: usize) -> String {
    let before: String = text[..start]
        .chars()
        .rev()
        .take(radius)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[end..].chars().take(radius).collect();
    format!("{}{}{}", before, &text[start..end], after)
}
