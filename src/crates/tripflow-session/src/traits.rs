//! The storage trait agent runtimes program against.

use crate::Result;
use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

/// Guard proving the caller owns the session's turn. Dropping it releases
/// the turn to the next waiter.
pub type TurnGuard = OwnedMutexGuard<()>;

/// Session-id-keyed checkpoint storage.
///
/// `get_state`/`checkpoint` are the read and write halves of a turn;
/// [`turn_lock`](SessionStore::turn_lock) serializes them per session. The
/// intended call shape is:
///
/// ```rust,ignore
/// let _turn = store.turn_lock(session_id).await;
/// let state = store.get_state(session_id).await?;
/// // ... walk the agent graph ...
/// store.checkpoint(session_id, final_state).await?;
/// ```
///
/// Implementations must never drop a session on their own; retention is an
/// external policy.
#[async_trait]
pub trait SessionStore<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Latest checkpoint for the session, or `None` for a fresh session.
    async fn get_state(&self, session_id: &str) -> Result<Option<S>>;

    /// Replace the session's checkpoint with `state`.
    async fn checkpoint(&self, session_id: &str, state: S) -> Result<()>;

    /// Acquire the session's turn lock. Turns for the same session id queue
    /// here; turns for different sessions proceed independently.
    async fn turn_lock(&self, session_id: &str) -> TurnGuard;
}
