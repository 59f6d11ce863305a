//! In-memory session storage.
//!
//! Reference implementation of [`SessionStore`]: checkpoints live in a
//! `RwLock<HashMap>` keyed by session id, turn locks in a sibling map of
//! per-session `tokio::Mutex`es. Data does not survive a restart; use it for
//! development, tests, and single-process deployments.

use crate::traits::{SessionStore, TurnGuard};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A session's checkpoint plus bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionRecord<S> {
    /// The checkpointed state.
    pub state: S,
    /// When the session was first seen.
    pub created_at: DateTime<Utc>,
    /// When the checkpoint was last replaced.
    pub updated_at: DateTime<Utc>,
    /// Number of checkpoints written (one per completed turn).
    pub turns: u64,
}

/// Thread-safe in-memory [`SessionStore`] backend.
pub struct InMemorySessionStore<S> {
    sessions: RwLock<HashMap<String, SessionRecord<S>>>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S> Default for InMemorySessionStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> InMemorySessionStore<S> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions that have checkpointed at least once.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl<S: Clone> InMemorySessionStore<S> {
    /// Full record for a session, including bookkeeping.
    pub async fn record(&self, session_id: &str) -> Option<SessionRecord<S>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[async_trait]
impl<S> SessionStore<S> for InMemorySessionStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn get_state(&self, session_id: &str) -> Result<Option<S>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|record| record.state.clone()))
    }

    async fn checkpoint(&self, session_id: &str, state: S) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(record) => {
                record.state = state;
                record.updated_at = now;
                record.turns += 1;
            }
            None => {
                tracing::debug!(session_id, "creating session record");
                sessions.insert(
                    session_id.to_string(),
                    SessionRecord {
                        state,
                        created_at: now,
                        updated_at: now,
                        turns: 1,
                    },
                );
            }
        }
        Ok(())
    }

    async fn turn_lock(&self, session_id: &str) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_session_has_no_state() {
        let store: InMemorySessionStore<String> = InMemorySessionStore::new();
        assert_eq!(store.get_state("s-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = InMemorySessionStore::new();
        store.checkpoint("s-1", "first".to_string()).await.unwrap();
        assert_eq!(
            store.get_state("s-1").await.unwrap(),
            Some("first".to_string())
        );

        store.checkpoint("s-1", "second".to_string()).await.unwrap();
        assert_eq!(
            store.get_state("s-1").await.unwrap(),
            Some("second".to_string())
        );

        let record = store.record("s-1").await.unwrap();
        assert_eq!(record.turns, 2);
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.checkpoint("a", 1u32).await.unwrap();
        store.checkpoint("b", 2u32).await.unwrap();
        assert_eq!(store.get_state("a").await.unwrap(), Some(1));
        assert_eq!(store.get_state("b").await.unwrap(), Some(2));
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn turn_lock_serializes_same_session() {
        let store: Arc<InMemorySessionStore<u32>> = Arc::new(InMemorySessionStore::new());

        let guard = store.turn_lock("s-1").await;

        // A second turn for the same session must wait...
        let contended = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.turn_lock("s-1").await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!contended.is_finished());

        // ...while another session proceeds immediately.
        let _other = store.turn_lock("s-2").await;

        drop(guard);
        contended.await.unwrap();
    }
}
