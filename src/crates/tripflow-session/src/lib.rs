//! # tripflow-session - Session checkpoint storage
//!
//! A conversation in tripflow is resumable: each turn restores the previous
//! [`ConversationState`] checkpoint for the session, walks an agent graph,
//! and persists the resulting state once at the graph boundary. This crate
//! owns that boundary.
//!
//! The [`SessionStore`] trait is the abstraction agent runtimes program
//! against; [`InMemorySessionStore`] is the reference backend (a thread-safe
//! map, suitable for development, tests, and single-process deployments).
//! Custom backends (Redis, SQL, ...) implement the same trait.
//!
//! Two guarantees matter here:
//!
//! - **Turns within one session are strictly ordered.** A turn must acquire
//!   the session's [turn lock](SessionStore::turn_lock) before reading the
//!   checkpoint and hold it until the new checkpoint is written, so the
//!   read-modify-write is atomic per session.
//! - **Sessions are independent.** Distinct session ids share nothing and
//!   may be processed concurrently.
//!
//! The store is generic over the state type so it stays decoupled from the
//! graph engine; `tripflow-core` instantiates it with `ConversationState`.
//!
//! [`ConversationState`]: https://docs.rs/tripflow-core

mod memory;
mod traits;

pub use memory::{InMemorySessionStore, SessionRecord};
pub use traits::{SessionStore, TurnGuard};

use thiserror::Error;

/// Errors a session backend can produce.
///
/// The in-memory backend is infallible, but the trait surfaces errors so
/// persistent backends can report I/O and serialization failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend storage failed.
    #[error("session backend error: {0}")]
    Backend(String),

    /// Checkpoint (de)serialization failed.
    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
