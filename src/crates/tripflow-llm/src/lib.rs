//! # tripflow-llm - LLM capability boundary
//!
//! Agents call the model through one narrow trait:
//!
//! ```rust,ignore
//! let text = llm.generate("서울 2박 3일 일정을 만들어줘", &history).await?;
//! ```
//!
//! [`LlmClient`] is the seam tests mock and production wires to
//! [`ClaudeClient`] (Anthropic's messages API over `reqwest`). Errors carry
//! a retryability probe; the one transient failure agents retry on a fixed
//! schedule is [`LlmError::Overloaded`] (see [`retry_on_overload`]).

pub mod claude;
pub mod config;
pub mod error;
pub mod retry;

pub use claude::ClaudeClient;
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use retry::retry_on_overload;

use async_trait::async_trait;
use tripflow_core::ChatMessage;

/// Text-generation capability the dialogue nodes depend on.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to `prompt` given the conversation so far.
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String>;
}
