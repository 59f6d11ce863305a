//! Error types for LLM provider calls.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when calling an LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API key not found in the environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// API authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The model is temporarily overloaded. The only error class the
    /// itinerary agent retries.
    #[error("model overloaded: {0}")]
    Overloaded(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider returned a payload we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// General provider-reported error.
    #[error("provider error: {0}")]
    Provider(String),
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Overloaded(_) | LlmError::RateLimited(_) | LlmError::Http(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}
