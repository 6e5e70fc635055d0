//! Mock provider implementation for testing.

use super::{
    CompletionChoice, CompletionProvider, CompletionRequest, CompletionResponse, ProviderError,
    TokenUsage,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock completion provider that records every request it receives.
pub struct MockCompletionProvider {
    configured: bool,
    fail: bool,
    reply: serde_json::Value,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionProvider {
    /// A configured provider that answers every request with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::replying_with(json!({ "role": "assistant", "content": reply.into() }))
    }

    /// A configured provider whose first choice carries `message` as given.
    pub fn replying_with(message: serde_json::Value) -> Self {
        Self {
            configured: true,
            fail: false,
            reply: message,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider without credentials.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying("")
        }
    }

    /// A configured provider whose calls always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if !self.configured {
            return Err(ProviderError::NotConfigured(
                "Mock provider not configured".to_string(),
            ));
        }
        if self.fail {
            return Err(ProviderError::ApiError("Mock provider failure".to_string()));
        }

        Ok(CompletionResponse {
            id: Some(format!("mock-{}", self.calls())),
            model: Some(request.model.clone()),
            choices: vec![CompletionChoice {
                index: 0,
                message: self.reply.clone(),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(TokenUsage::default()),
        })
    }
}
