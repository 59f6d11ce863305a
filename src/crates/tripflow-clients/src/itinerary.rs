//! Saved-itinerary boundary.
//!
//! The list, calendar, and sharing agents read previously generated
//! itineraries through [`ItineraryStore`]. Durable persistence belongs to
//! the hosting application; [`InMemoryItineraryStore`] covers development,
//! tests, and single-process deployments.

use crate::{ClientError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// One saved travel itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub destination: String,
    pub date: NaiveDate,
    /// Full generated plan text.
    pub content: String,
}

/// Read/write access to saved itineraries.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// All itineraries for a user, newest date first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Itinerary>>;

    /// A single itinerary by id.
    async fn get(&self, id: i64) -> Result<Itinerary>;

    /// Persist a new itinerary, returning it with its assigned id.
    async fn save(&self, itinerary: Itinerary) -> Result<Itinerary>;
}

/// Thread-safe in-memory [`ItineraryStore`].
#[derive(Default)]
pub struct InMemoryItineraryStore {
    records: RwLock<HashMap<i64, Itinerary>>,
    next_id: AtomicI64,
}

impl InMemoryItineraryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ItineraryStore for InMemoryItineraryStore {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Itinerary>> {
        let records = self.records.read().await;
        let mut list: Vec<Itinerary> = records
            .values()
            .filter(|itinerary| itinerary.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn get(&self, id: i64) -> Result<Itinerary> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("itinerary {id}")))
    }

    async fn save(&self, mut itinerary: Itinerary) -> Result<Itinerary> {
        if itinerary.id == 0 {
            itinerary.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }
        self.records
            .write()
            .await
            .insert(itinerary.id, itinerary.clone());
        Ok(itinerary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itinerary(user_id: i64, title: &str, date: &str) -> Itinerary {
        Itinerary {
            id: 0,
            user_id,
            title: title.to_string(),
            destination: "서울".to_string(),
            date: date.parse().unwrap(),
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn save_assigns_ids_and_get_finds_them() {
        let store = InMemoryItineraryStore::new();
        let saved = store.save(itinerary(1, "서울 여행", "2025-05-01")).await.unwrap();
        assert!(saved.id > 0);
        assert_eq!(store.get(saved.id).await.unwrap().title, "서울 여행");
        assert!(matches!(store.get(999).await, Err(ClientError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_is_per_user_and_newest_first() {
        let store = InMemoryItineraryStore::new();
        store.save(itinerary(1, "오래된 여행", "2025-01-01")).await.unwrap();
        store.save(itinerary(1, "최근 여행", "2025-06-01")).await.unwrap();
        store.save(itinerary(2, "다른 사람 여행", "2025-03-01")).await.unwrap();

        let list = store.list_for_user(1).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "최근 여행");
        assert_eq!(list[1].title, "오래된 여행");
    }
}
