//! Provider configuration.

use crate::error::{LlmError, Result};
use std::time::Duration;

/// Default Claude model when `ANTHROPIC_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Connection settings for a remote LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: model.into(),
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }

    /// Load from `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::ApiKeyNotFound("ANTHROPIC_API_KEY".to_string()))?;
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
