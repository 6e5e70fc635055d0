//! Completion provider abstractions and implementations.
//!
//! The handler talks to a [`CompletionProvider`] trait object so the
//! OpenAI client can be swapped for a mock in tests.

pub mod mock;
pub mod openai;

use crate::config::OpenAiConfig;
use crate::models::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Completion contained no choices")]
    EmptyResponse,
}

impl ProviderError {
    /// Metrics label for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::EmptyResponse => "empty_response",
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    /// Inbound request ID, propagated as `x-request-id`.
    #[serde(skip)]
    pub request_id: Option<String>,
}

/// Chat completion response. Fields beyond these are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    /// Kept as raw JSON so fields such as `refusal` or `tool_calls` reach
    /// the caller unchanged.
    pub message: serde_json::Value,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl CompletionResponse {
    /// The message of the first choice.
    pub fn into_first_message(self) -> Result<serde_json::Value, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ProviderError::EmptyResponse)
    }
}

/// Trait for chat completion providers (e.g., OpenAI).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Whether the provider credential is present.
    fn is_configured(&self) -> bool;

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// How a conversation is turned into a provider request.
///
/// Model and system preamble are fixed per process; they never depend on
/// request input.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub system_prompt: String,
    /// When false, caller messages are checked for presence only and the
    /// provider receives just the system preamble.
    pub forward_messages: bool,
}

impl From<&OpenAiConfig> for CompletionSettings {
    fn from(config: &OpenAiConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            forward_messages: config.forward_messages,
        }
    }
}

impl CompletionSettings {
    pub fn build_request(
        &self,
        messages: serde_json::Value,
        request_id: Option<String>,
    ) -> Result<CompletionRequest, serde_json::Error> {
        let mut transcript = vec![ChatMessage::system(self.system_prompt.as_str())];

        if self.forward_messages {
            let caller: Vec<ChatMessage> = serde_json::from_value(messages)?;
            transcript.extend(caller);
        }

        Ok(CompletionRequest {
            model: self.model.clone(),
            messages: transcript,
            request_id,
        })
    }
}
