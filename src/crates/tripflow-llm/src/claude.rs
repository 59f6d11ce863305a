//! Anthropic Claude client.
//!
//! Implements [`LlmClient`] over the messages API. Claude keeps system
//! messages separate from the conversation, so the transcript is split
//! before the request is built; the prompt itself is sent as the trailing
//! user message.

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::LlmClient;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tripflow_core::{ChatMessage, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: LlmConfig,
    client: Client,
}

impl ClaudeClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self { config, client })
    }

    /// Split the transcript into Claude's system prompt + turn messages and
    /// append the current prompt as the final user turn.
    fn build_messages(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> (Option<String>, Vec<ApiMessage>) {
        let mut system: Option<String> = None;
        let mut messages = Vec::with_capacity(history.len() + 1);

        for message in history {
            match message.role {
                Role::System => {
                    system = Some(match system.take() {
                        Some(existing) => format!("{}\n\n{}", existing, message.content),
                        None => message.content.clone(),
                    });
                }
                Role::User => messages.push(ApiMessage {
                    role: "user",
                    content: message.content.clone(),
                }),
                Role::Assistant => messages.push(ApiMessage {
                    role: "assistant",
                    content: message.content.clone(),
                }),
            }
        }

        messages.push(ApiMessage {
            role: "user",
            content: prompt.to_string(),
        });

        (system, messages)
    }

    fn parse_response(&self, response: ApiResponse) -> Result<String> {
        let text: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "response contained no text blocks".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String> {
        let (system, messages) = self.build_messages(prompt, history);

        let request = ApiRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
        };

        let url = format!("{}/v1/messages", self.config.base_url);
        tracing::debug!(model = %self.config.model, "calling claude");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let parsed: ApiResponse = response.json().await?;
        self.parse_response(parsed)
    }
}

/// Map an error status + body to the error taxonomy. Anthropic reports
/// overload either as HTTP 529 or as an `overloaded_error` body.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    if status.as_u16() == 529 || body.contains("overloaded_error") {
        return LlmError::Overloaded(format!("{status}: {body}"));
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::Authentication(format!("{status}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(format!("{status}: {body}")),
        _ => LlmError::Provider(format!("{status}: {body}")),
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}
