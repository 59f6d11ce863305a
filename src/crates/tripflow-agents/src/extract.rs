//! Travel-information extraction from Korean utterances.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Slots the itinerary agent fills from free text. Empty string = not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelInfo {
    pub destination: String,
    pub duration: String,
    pub travelers: String,
    pub budget: String,
}

impl TravelInfo {
    /// Context updates for `ConversationState::merge_context`. Empty slots
    /// are included on purpose - the merge discards them, which is exactly
    /// the never-regress behavior we want.
    pub fn context_updates(&self) -> Vec<(String, Value)> {
        vec![
            ("destination".to_string(), json!(self.destination)),
            ("duration".to_string(), json!(self.duration)),
            ("travelers".to_string(), json!(self.travelers)),
            ("budget".to_string(), json!(self.budget)),
        ]
    }
}

struct TravelPatterns {
    destination: Regex,
    durations: Vec<Regex>,
    travelers: Regex,
    budget: Regex,
}

fn patterns() -> &'static TravelPatterns {
    static PATTERNS: OnceLock<TravelPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("travel pattern must compile");
        TravelPatterns {
            destination: compile(r"([가-힣A-Za-z]+)\s?지역"),
            durations: vec![
                compile(r"\d+\s*박\s*\d+\s*일"),
                compile(r"\d+\s*일\s*동안"),
                compile(r"당일치기"),
                compile(r"\d+\s*박"),
            ],
            travelers: compile(r"\d+\s?명"),
            budget: compile(r"\d+\s?만원|\d+\s?원"),
        }
    })
}

/// Pull destination/duration/travelers/budget out of an utterance.
pub fn extract_travel_info(text: &str) -> TravelInfo {
    let patterns = patterns();
    let mut info = TravelInfo::default();

    if let Some(captures) = patterns.destination.captures(text) {
        info.destination = captures[1].to_string();
    }

    for pattern in &patterns.durations {
        if let Some(found) = pattern.find(text) {
            info.duration = found.as_str().to_string();
            break;
        }
    }

    if let Some(found) = patterns.travelers.find(text) {
        info.travelers = found.as_str().to_string();
    }
    if let Some(found) = patterns.budget.find(text) {
        info.budget = found.as_str().to_string();
    }

    info
}
