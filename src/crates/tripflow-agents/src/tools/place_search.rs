//! Place-search tool for the itinerary loop.

use crate::place_parse::{format_places, DEFAULT_COUNT};
use crate::tools::{AgentTool, ToolError};
use async_trait::async_trait;
use std::sync::Arc;
use tripflow_clients::{PlaceSearch, SearchCache};

/// Lets the planning loop look up real places for a keyword query.
pub struct PlaceSearchTool {
    places: Arc<dyn PlaceSearch>,
    cache: Arc<SearchCache>,
}

impl PlaceSearchTool {
    pub fn new(places: Arc<dyn PlaceSearch>, cache: Arc<SearchCache>) -> Self {
        Self { places, cache }
    }
}

#[async_trait]
impl AgentTool for PlaceSearchTool {
    fn name(&self) -> &'static str {
        "place_search"
    }

    fn description(&self) -> &'static str {
        "키워드로 장소를 검색합니다. 입력 예: '서울 성수동 카페'"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError("검색어가 비어 있습니다".to_string()));
        }

        if let Some(cached) = self.cache.get(query).await {
            tracing::debug!(%query, "place search served from cache");
            return Ok(format_places(&cached));
        }

        let places = self
            .places
            .search_places(query, None, DEFAULT_COUNT)
            .await
            .map_err(|error| ToolError(format!("장소 검색 실패: {error}")))?;

        self.cache.put(query.to_string(), places.clone()).await;
        Ok(format_places(&places))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tripflow_clients::{Place, Result as ClientResult};

    struct CountingSearch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlaceSearch for CountingSearch {
        async fn search_places(
            &self,
            query: &str,
            _location: Option<&str>,
            _size: usize,
        ) -> ClientResult<Vec<Place>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Place {
                name: format!("{query} 1호점"),
                category: "카페".into(),
                address: "서울".into(),
                road_address: None,
                phone: None,
                url: None,
            }])
        }
    }

    #[tokio::test]
    async fn second_identical_query_hits_the_cache() {
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
        });
        let tool = PlaceSearchTool::new(search.clone(), Arc::new(SearchCache::new()));

        let first = tool.call("성수동 카페").await.unwrap();
        let second = tool.call("성수동 카페").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_query_is_an_error() {
        let tool = PlaceSearchTool::new(
            Arc::new(CountingSearch {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(SearchCache::new()),
        );
        assert!(tool.call("   ").await.is_err());
    }
}
