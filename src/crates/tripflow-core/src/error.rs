//! Error types for graph construction and execution.

use thiserror::Error;

/// Errors produced by the graph engine.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph structure invalid (missing entry, unknown transition target, ...).
    /// Raised at `compile()` time so a malformed graph never runs.
    #[error("graph validation error: {0}")]
    Validation(String),

    /// A node failed in a way the guarded wrapper could not contain.
    #[error("node '{node}' execution failed: {message}")]
    NodeExecution { node: String, message: String },

    /// General execution failure (step budget exhausted, ...).
    #[error("graph execution error: {0}")]
    Execution(String),

    /// Session checkpoint read/write failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// State (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
