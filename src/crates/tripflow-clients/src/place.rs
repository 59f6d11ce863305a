//! Keyword place search.
//!
//! [`PlaceSearch`] is the capability trait; [`KakaoPlaceClient`] implements
//! it over Kakao's local-search API. Results are cached in an explicit
//! [`SearchCache`] keyed by the formatted query string. The cache never
//! evicts: identical queries within one process lifetime are served from
//! memory, which both spares the quota and keeps a turn's repeated tool
//! calls deterministic.

use crate::{ClientError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

const KAKAO_BASE_URL: &str = "https://dapi.kakao.com/v2/local";

/// One place document, normalized from the provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub category: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Place-search capability.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Search places by keyword, optionally constrained to a location term,
    /// returning at most `size` results.
    async fn search_places(
        &self,
        query: &str,
        location: Option<&str>,
        size: usize,
    ) -> Result<Vec<Place>>;
}

/// Injected result cache for place searches.
///
/// Key: the full formatted query string. Policy: never evict - entries live
/// for the process lifetime. That is a deliberate choice, not an accident:
/// search results changing mid-conversation would be more confusing than a
/// slightly stale listing.
#[derive(Default)]
pub struct SearchCache {
    entries: RwLock<HashMap<String, Vec<Place>>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Place>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, places: Vec<Place>) {
        self.entries.write().await.insert(key, places);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Kakao local-search client.
pub struct KakaoPlaceClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl KakaoPlaceClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ClientError::Configuration(
                "KAKAO_REST_KEY is empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            base_url: KAKAO_BASE_URL.to_string(),
            client: Client::new(),
        })
    }

    /// Load the key from `KAKAO_REST_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("KAKAO_REST_KEY")
            .map_err(|_| ClientError::Configuration("KAKAO_REST_KEY not set".to_string()))?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PlaceSearch for KakaoPlaceClient {
    async fn search_places(
        &self,
        query: &str,
        location: Option<&str>,
        size: usize,
    ) -> Result<Vec<Place>> {
        let keyword = match location {
            Some(location) if !query.contains(location) => format!("{location} {query}"),
            _ => query.to_string(),
        };
        let size = size.clamp(1, 15);

        tracing::debug!(%keyword, size, "kakao keyword search");

        let url = format!("{}/search/keyword.json", self.base_url);
        let size_param = size.to_string();
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .query(&[("query", keyword.as_str()), ("size", size_param.as_str())])
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

        let payload: KeywordSearchResponse = response.json().await?;
        Ok(payload.documents.into_iter().map(Place::from).collect())
    }
}

#[derive(Deserialize)]
struct KeywordSearchResponse {
    documents: Vec<KakaoDocument>,
}

#[derive(Deserialize)]
struct KakaoDocument {
    place_name: String,
    #[serde(default)]
    category_name: String,
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    road_address_name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    place_url: String,
}

impl From<KakaoDocument> for Place {
    fn from(doc: KakaoDocument) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Place {
            name: doc.place_name,
            category: doc.category_name,
            address: doc.address_name,
            road_address: non_empty(doc.road_address_name),
            phone: non_empty(doc.phone),
            url: non_empty(doc.place_url),
        }
    }
}
