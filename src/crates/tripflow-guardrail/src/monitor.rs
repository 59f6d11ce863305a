//! Log-only response monitoring.
//!
//! [`ResponseMonitor`] scans assistant output for the same hallucination
//! classes as the validator plus factual-claim and ethically dubious
//! phrasing, tracks how often each class fires, and emits one `tracing`
//! record per finding. It is purely observational: the wrapper calls
//! [`ResponseMonitor::analyze_and_log`] on every node output, but the report
//! never alters state or routing.
//!
//! Repeat findings are de-duplicated through a known-issue set so the
//! statistics count distinct fabrications rather than re-renders of the same
//! streamed message.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Classes of finding the monitor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorIssueKind {
    /// Phone-number shaped text.
    Contact,
    /// Absolute price shaped text.
    Price,
    /// Street-address shaped text.
    Address,
    /// Guarantee/overclaiming phrasing.
    Guarantee,
    /// Definitive factual-claim phrasing.
    FactualClaim,
    /// Phrasing that suggests illegal or unauthorized activity.
    Ethical,
}

impl MonitorIssueKind {
    fn label(&self) -> &'static str {
        match self {
            MonitorIssueKind::Contact => "전화번호",
            MonitorIssueKind::Price => "가격정보",
            MonitorIssueKind::Address => "주소정보",
            MonitorIssueKind::Guarantee => "보증표현",
            MonitorIssueKind::FactualClaim => "사실주장",
            MonitorIssueKind::Ethical => "윤리문제",
        }
    }
}

/// One monitor finding with its surrounding context.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorIssue {
    pub kind: MonitorIssueKind,
    pub detected: String,
    pub context: String,
}

/// Analysis of a single response.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub timestamp: DateTime<Utc>,
    pub node: Option<String>,
    pub session_id: Option<String>,
    pub response_length: usize,
    pub issues: Vec<MonitorIssue>,
    /// 10.0 minus 0.5 per issue, floored at 0.
    pub score: f64,
}

/// Aggregate counters since construction (or the last [`ResponseMonitor::reset`]).
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatistics {
    pub issue_counts: HashMap<String, u64>,
    pub total_issues: u64,
    pub unique_issues: usize,
}

#[derive(Default)]
struct MonitorState {
    counts: HashMap<MonitorIssueKind, u64>,
    known: HashSet<String>,
}

/// Append-only issue detector shared by every agent graph.
pub struct ResponseMonitor {
    phone_patterns: Vec<Regex>,
    price_patterns: Vec<Regex>,
    address_patterns: Vec<Regex>,
    guarantee_patterns: Vec<Regex>,
    factual_pattern: Regex,
    ethical_patterns: Vec<Regex>,
    state: Mutex<MonitorState>,
}

impl Default for ResponseMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseMonitor {
    pub fn new() -> Self {
        let compile = |p: &str| Regex::new(p).expect("monitor pattern must compile");

        Self {
            phone_patterns: vec![
                compile(r"010-\d{4}-\d{4}"),
                compile(r"02-\d{3,4}-\d{4}"),
                compile(r"0\d{1,2}-\d{3,4}-\d{4}"),
            ],
            price_patterns: vec![
                compile(r"\d{1,3}(?:,\d{3})*원"),
                compile(r"₩\s*\d{1,3}(?:,\d{3})*"),
            ],
            address_patterns: vec![
                compile(r"서울특별시\s\S+구\s\S+동\s[\d-]+"),
                compile(r"서울시\s\S+구\s\S+동\s[\d-]+"),
                compile(r"\S+도\s\S+시\s\S+구\s\S+동\s[\d-]+"),
            ],
            guarantee_patterns: vec![
                compile(r"확실히"),
                compile(r"보장합니다"),
                compile(r"틀림없이"),
                compile(r"100%"),
                compile(r"반드시"),
                compile(r"항상"),
                compile(r"절대로"),
            ],
            factual_pattern: compile(r"(?:실제로|사실은|사실상|진짜로)[^.?!]*[.?!]"),
            ethical_patterns: vec![
                compile(r"불법으로"),
                compile(r"허가 없이"),
                compile(r"몰래"),
                compile(r"등록 필요없이"),
                compile(r"증명서 없이"),
            ],
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Analyze a response, update statistics, and log every new finding.
    ///
    /// Returns the report so callers can attach it to diagnostics; the
    /// caller must not use it to alter control flow.
    pub fn analyze_and_log(
        &self,
        response: &str,
        node: Option<&str>,
        session_id: Option<&str>,
    ) -> MonitorReport {
        let mut issues = self.detect_hallucinations(response);
        issues.extend(self.check_factual_accuracy(response));
        issues.extend(self.detect_ethical_issues(response));

        let score = (10.0 - issues.len() as f64 * 0.5).max(0.0);

        if issues.is_empty() {
            tracing::debug!(node, session_id, score, "response analysis: no issues");
        } else {
            tracing::warn!(
                node,
                session_id,
                count = issues.len(),
                score,
                "response analysis found issues"
            );
            for issue in &issues {
                tracing::warn!(
                    node,
                    session_id,
                    kind = issue.kind.label(),
                    detected = %issue.detected,
                    "monitor issue"
                );
            }
        }

        MonitorReport {
            timestamp: Utc::now(),
            node: node.map(str::to_string),
            session_id: session_id.map(str::to_string),
            response_length: response.chars().count(),
            issues,
            score,
        }
    }

    fn detect_hallucinations(&self, response: &str) -> Vec<MonitorIssue> {
        let groups: [(MonitorIssueKind, &[Regex]); 4] = [
            (MonitorIssueKind::Contact, &self.phone_patterns),
            (MonitorIssueKind::Price, &self.price_patterns),
            (MonitorIssueKind::Address, &self.address_patterns),
            (MonitorIssueKind::Guarantee, &self.guarantee_patterns),
        ];

        let mut issues = Vec::new();
        for (kind, patterns) in groups {
            for pattern in patterns {
                for m in pattern.find_iter(response) {
                    self.record(
                        kind,
                        m.as_str(),
                        &context_window(response, m.start(), m.end()),
                        &mut issues,
                    );
                }
            }
        }
        issues
    }

    fn check_factual_accuracy(&self, response: &str) -> Vec<MonitorIssue> {
        let mut issues = Vec::new();
        for m in self.factual_pattern.find_iter(response) {
            self.record(
                MonitorIssueKind::FactualClaim,
                m.as_str(),
                m.as_str(),
                &mut issues,
            );
        }
        issues
    }

    fn detect_ethical_issues(&self, response: &str) -> Vec<MonitorIssue> {
        let mut issues = Vec::new();
        for pattern in &self.ethical_patterns {
            for m in pattern.find_iter(response) {
                self.record(
                    MonitorIssueKind::Ethical,
                    m.as_str(),
                    &context_window(response, m.start(), m.end()),
                    &mut issues,
                );
            }
        }
        issues
    }

    /// Count the finding; only previously unseen `(kind, detected)` pairs
    /// make it into the report.
    fn record(
        &self,
        kind: MonitorIssueKind,
        detected: &str,
        context: &str,
        issues: &mut Vec<MonitorIssue>,
    ) {
        let key = format!("{}:{}", kind.label(), detected);
        let mut state = self.state.lock().expect("monitor state poisoned");
        *state.counts.entry(kind).or_insert(0) += 1;
        if state.known.insert(key) {
            issues.push(MonitorIssue {
                kind,
                detected: detected.to_string(),
                context: context.to_string(),
            });
        }
    }

    /// Aggregate counters for observability endpoints.
    pub fn statistics(&self) -> MonitorStatistics {
        let state = self.state.lock().expect("monitor state poisoned");
        let issue_counts: HashMap<String, u64> = state
            .counts
            .iter()
            .map(|(kind, count)| (kind.label().to_string(), *count))
            .collect();
        MonitorStatistics {
            total_issues: issue_counts.values().sum(),
            unique_issues: state.known.len(),
            issue_counts,
        }
    }

    /// Clear counters and the known-issue set.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("monitor state poisoned");
        state.counts.clear();
        state.known.clear();
    }
}

/// Up to 20 characters of context on each side of a byte range.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let before: String = text[..start]
        .chars()
        .rev()
        .take(20)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[end..].chars().take(20).collect();
    format!("{}{}{}", before, &text[start..end], after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_response_scores_ten() {
        let monitor = ResponseMonitor::new();
        let report = monitor.analyze_and_log("서울 여행을 추천드립니다", None, None);
        assert!(report.issues.is_empty());
        assert_eq!(report.score, 10.0);
    }

    #[test]
    fn phone_and_guarantee_are_detected() {
        let monitor = ResponseMonitor::new();
        let report = monitor.analyze_and_log(
            "예약은 02-123-4567 로, 반드시 방문하세요",
            Some("conversation"),
            Some("s-1"),
        );
        let kinds: Vec<_> = report.issues.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&MonitorIssueKind::Contact));
        assert!(kinds.contains(&MonitorIssueKind::Guarantee));
        assert!(report.score < 10.0);
    }

    #[test]
    fn repeated_finding_counts_but_reports_once() {
        let monitor = ResponseMonitor::new();
        let first = monitor.analyze_and_log("문의: 010-1111-2222", None, None);
        assert_eq!(first.issues.len(), 1);

        let second = monitor.analyze_and_log("문의: 010-1111-2222", None, None);
        assert!(second.issues.is_empty());

        let stats = monitor.statistics();
        assert_eq!(stats.issue_counts.get("전화번호"), Some(&2));
        assert_eq!(stats.unique_issues, 1);
    }

    #[test]
    fn factual_claims_are_flagged() {
        let monitor = ResponseMonitor::new();
        let report = monitor.analyze_and_log("사실은 여기가 원조 맛집입니다.", None, None);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, MonitorIssueKind::FactualClaim);
    }

    #[test]
    fn reset_clears_statistics() {
        let monitor = ResponseMonitor::new();
        monitor.analyze_and_log("010-1111-2222", None, None);
        monitor.reset();
        let stats = monitor.statistics();
        assert_eq!(stats.total_issues, 0);
        assert_eq!(stats.unique_issues, 0);
    }
}
