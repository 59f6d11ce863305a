//! # tripflow-guardrail - Response validation and monitoring
//!
//! Every piece of assistant-authored text in tripflow passes through this
//! crate before it reaches a client. Two components cooperate:
//!
//! - [`ResponseValidator`] - deterministic text transforms that scrub or
//!   soften content an LLM cannot be trusted to state as fact: unverified
//!   URLs, absolute prices, exact operating hours, fabricated contact
//!   details, and overconfident phrasing.
//! - [`ResponseMonitor`] - a log-only analyzer that detects the same
//!   hallucination classes, keeps per-kind frequency counters, and scores
//!   each response for observability. It never changes control flow.
//!
//! The validator is a plain injected component: regexes are compiled once in
//! [`ResponseValidator::new`] and the instance is shared behind an `Arc` by
//! the node wrapper in `tripflow-core`. All transforms are pure - the same
//! input always produces the same output and the only side effect is
//! `tracing` output.
//!
//! ```rust
//! use tripflow_guardrail::ResponseValidator;
//!
//! let validator = ResponseValidator::new();
//! let validated = validator.validate("이 식당은 10,000원 입니다");
//! assert!(validated.text.contains("약 10,000원"));
//! assert_eq!(validated.issues.len(), 1);
//! ```

pub mod monitor;
pub mod node_checks;
pub mod validator;

pub use monitor::{MonitorIssue, MonitorIssueKind, MonitorReport, MonitorStatistics, ResponseMonitor};
pub use node_checks::apply_node_checks;
pub use validator::{Issue, IssueKind, ResponseValidator, Validated};
