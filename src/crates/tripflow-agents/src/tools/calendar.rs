//! Calendar-registration tool for the itinerary loop.

use crate::tools::{AgentTool, ToolError};
use async_trait::async_trait;
use std::sync::Arc;
use tripflow_clients::{Calendar, ItineraryStore};

/// Registers a saved itinerary (by id) as a calendar event.
pub struct CalendarRegisterTool {
    calendar: Arc<dyn Calendar>,
    itineraries: Arc<dyn ItineraryStore>,
}

impl CalendarRegisterTool {
    pub fn new(calendar: Arc<dyn Calendar>, itineraries: Arc<dyn ItineraryStore>) -> Self {
        Self {
            calendar,
            itineraries,
        }
    }
}

#[async_trait]
impl AgentTool for CalendarRegisterTool {
    fn name(&self) -> &'static str {
        "calendar_register"
    }

    fn description(&self) -> &'static str {
        "저장된 일정을 캘린더에 등록합니다. 입력: 일정 id 숫자"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let id: i64 = input
            .trim()
            .parse()
            .map_err(|_| ToolError(format!("일정 id를 해석할 수 없습니다: {input}")))?;

        let itinerary = self
            .itineraries
            .get(id)
            .await
            .map_err(|error| ToolError(format!("일정 조회 실패: {error}")))?;

        let event = self
            .calendar
            .add_itinerary(&itinerary)
            .await
            .map_err(|error| ToolError(format!("캘린더 등록 실패: {error}")))?;

        Ok(match event.html_link {
            Some(link) => format!("'{}' 일정이 캘린더에 추가되었습니다: {link}", itinerary.title),
            None => format!("'{}' 일정이 캘린더에 추가되었습니다", itinerary.title),
        })
    }
}
