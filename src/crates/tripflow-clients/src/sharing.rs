//! Share-link creation capability.
//!
//! The sharing agent turns "이 일정 공유해줘" into a tokenized link with an
//! expiry window. [`LocalShareLinks`] issues links directly (uuid token
//! under the configured base URL) and remembers what it issued; a hosted
//! deployment can swap in an implementation that calls its public-API
//! endpoint instead.

use crate::{ClientError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read-only vs editable share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareType {
    View,
    Edit,
}

/// A created share link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub itinerary_id: i64,
    pub share_type: ShareType,
    pub share_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Share-link capability.
#[async_trait]
pub trait ShareLinks: Send + Sync {
    /// Create a link for the itinerary, valid for `days` days. `base_url`
    /// overrides the configured default for this call.
    async fn create_share_link(
        &self,
        itinerary_id: i64,
        share_type: ShareType,
        days: u32,
        base_url: Option<&str>,
    ) -> Result<ShareLink>;
}

/// In-process share-link issuer.
pub struct LocalShareLinks {
    default_base_url: String,
    issued: RwLock<HashMap<String, ShareLink>>,
}

impl LocalShareLinks {
    pub fn new(default_base_url: impl Into<String>) -> Self {
        Self {
            default_base_url: default_base_url.into(),
            issued: RwLock::new(HashMap::new()),
        }
    }

    /// A previously issued link by token, if still known.
    pub async fn lookup(&self, token: &str) -> Option<ShareLink> {
        self.issued.read().await.get(token).cloned()
    }
}

#[async_trait]
impl ShareLinks for LocalShareLinks {
    async fn create_share_link(
        &self,
        itinerary_id: i64,
        share_type: ShareType,
        days: u32,
        base_url: Option<&str>,
    ) -> Result<ShareLink> {
        if itinerary_id <= 0 {
            return Err(ClientError::InvalidResponse(format!(
                "invalid itinerary id: {itinerary_id}"
            )));
        }

        let base = base_url.unwrap_or(&self.default_base_url).trim_end_matches('/');
        let token = Uuid::new_v4().simple().to_string();
        let created_at = Utc::now();
        let link = ShareLink {
            itinerary_id,
            share_type,
            share_url: format!("{base}/share/{token}"),
            created_at,
            expires_at: created_at + Duration::days(i64::from(days.clamp(1, 30))),
        };

        tracing::info!(itinerary_id, ?share_type, days, "share link created");
        self.issued.write().await.insert(token, link.clone());
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_link_under_base_url_with_expiry() {
        let links = LocalShareLinks::new("https://tripflow.com");
        let link = links
            .create_share_link(7, ShareType::View, 7, None)
            .await
            .unwrap();

        assert!(link.share_url.starts_with("https://tripflow.com/share/"));
        assert_eq!((link.expires_at - link.created_at).num_days(), 7);

        let token = link.share_url.rsplit('/').next().unwrap();
        assert_eq!(links.lookup(token).await, Some(link));
    }

    #[tokio::test]
    async fn call_base_url_overrides_default() {
        let links = LocalShareLinks::new("https://tripflow.com");
        let link = links
            .create_share_link(7, ShareType::Edit, 3, Some("http://localhost:8000/"))
            .await
            .unwrap();
        assert!(link.share_url.starts_with("http://localhost:8000/share/"));
    }

    #[tokio::test]
    async fn days_are_clamped_to_a_month() {
        let links = LocalShareLinks::new("https://tripflow.com");
        let link = links
            .create_share_link(7, ShareType::View, 90, None)
            .await
            .unwrap();
        assert_eq!((link.expires_at - link.created_at).num_days(), 30);
    }

    #[tokio::test]
    async fn non_positive_id_is_rejected() {
        let links = LocalShareLinks::new("https://tripflow.com");
        assert!(links
            .create_share_link(0, ShareType::View, 7, None)
            .await
            .is_err());
    }
}
