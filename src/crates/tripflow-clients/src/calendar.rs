//! Calendar registration capability.
//!
//! The calendar agent registers saved itineraries as all-day events.
//! [`HttpCalendarClient`] targets a Google-Calendar-shaped events endpoint
//! with a bearer token; credential acquisition (OAuth, service accounts) is
//! the hosting deployment's concern and stays outside this boundary.

use crate::itinerary::Itinerary;
use crate::{ClientError, Result};
use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Reference to a created calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventRef {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// Calendar capability the calendar agent depends on.
#[async_trait]
pub trait Calendar: Send + Sync {
    /// Register an itinerary as a calendar event.
    async fn add_itinerary(&self, itinerary: &Itinerary) -> Result<CalendarEventRef>;
}

/// HTTP calendar client (Google Calendar events API shape).
pub struct HttpCalendarClient {
    calendar_id: String,
    token: String,
    base_url: String,
    client: Client,
}

impl HttpCalendarClient {
    pub fn new(calendar_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            token: token.into(),
            base_url: GOOGLE_CALENDAR_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Load settings from `GOOGLE_CALENDAR_ID` / `GOOGLE_CALENDAR_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let calendar_id = std::env::var("GOOGLE_CALENDAR_ID")
            .map_err(|_| ClientError::Configuration("GOOGLE_CALENDAR_ID not set".to_string()))?;
        let token = std::env::var("GOOGLE_CALENDAR_TOKEN")
            .map_err(|_| ClientError::Configuration("GOOGLE_CALENDAR_TOKEN not set".to_string()))?;
        Ok(Self::new(calendar_id, token))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Calendar for HttpCalendarClient {
    async fn add_itinerary(&self, itinerary: &Itinerary) -> Result<CalendarEventRef> {
        let event = EventRequest::all_day(itinerary);
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url, self.calendar_id
        );

        tracing::debug!(itinerary_id = itinerary.id, "creating calendar event");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let created: EventResponse = response.json().await?;
        Ok(CalendarEventRef {
            event_id: created.id,
            html_link: created.html_link,
        })
    }
}

#[derive(Debug, Serialize)]
struct EventRequest {
    summary: String,
    description: String,
    start: EventDate,
    end: EventDate,
}

#[derive(Debug, Serialize)]
struct EventDate {
    date: String,
}

impl EventRequest {
    /// All-day event on the itinerary date.
    fn all_day(itinerary: &Itinerary) -> Self {
        Self {
            summary: format!("{} - {}", itinerary.title, itinerary.destination),
            description: itinerary.content.clone(),
            start: EventDate {
                date: itinerary.date.to_string(),
            },
            end: EventDate {
                date: (itinerary.date + Duration::days(1)).to_string(),
            },
        }
    }
}

#[derive(Deserialize)]
struct EventResponse {
    id: String,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_day_event_spans_one_day() {
        let itinerary = Itinerary {
            id: 3,
            user_id: 1,
            title: "서울 여행".into(),
            destination: "서울".into(),
            date: "2025-05-01".parse().unwrap(),
            content: "1일차: 경복궁".into(),
        };

        let event = EventRequest::all_day(&itinerary);
        assert_eq!(event.summary, "서울 여행 - 서울");
        assert_eq!(event.start.date, "2025-05-01");
        assert_eq!(event.end.date, "2025-05-02");
    }

    #[test]
    fn event_response_parses_with_and_without_link() {
        let with: EventResponse = serde_json::from_str(
            r#"{"id":"evt-1","htmlLink":"https://calendar.google.com/event?eid=1"}"#,
        )
        .unwrap();
        assert_eq!(with.id, "evt-1");
        assert!(with.html_link.is_some());

        let without: EventResponse = serde_json::from_str(r#"{"id":"evt-2"}"#).unwrap();
        assert_eq!(without.html_link, None);
    }
}
