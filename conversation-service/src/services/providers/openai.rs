//! OpenAI chat completions provider.

use super::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};
use crate::config::OpenAiConfig;
use crate::services::metrics;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use service_core::observability::TracedClientExt;
use std::time::{Duration, Instant};

const PROVIDER_NAME: &str = "openai";

/// OpenAI provider. Holds an optional API key; without one every call fails
/// with [`ProviderError::NotConfigured`].
pub struct OpenAiProvider {
    api_key: Option<Secret<String>>,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("OpenAI API key is not set".to_string())
        })?;

        tracing::debug!(
            model = %request.model,
            message_count = request.messages.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .traced_post(&self.completions_url())
            .bearer_auth(api_key.expose_secret())
            .json(request)
            .send(request.request_id.as_deref())
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let start = Instant::now();
        let result = self.send(request).await;

        match &result {
            Ok(response) => {
                metrics::record_provider_call(
                    PROVIDER_NAME,
                    &request.model,
                    start.elapsed().as_secs_f64(),
                );
                if let Some(usage) = response.usage {
                    metrics::record_tokens(
                        &request.model,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                    );
                }
                tracing::info!(
                    model = %request.model,
                    completion_id = response.id.as_deref().unwrap_or("-"),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "OpenAI completion succeeded"
                );
            }
            Err(e) => {
                metrics::record_provider_error(PROVIDER_NAME, e.kind());
                tracing::warn!(model = %request.model, error = %e, "OpenAI completion failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, api_key: Option<&str>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.map(|k| Secret::new(k.to_string())),
            base_url: base_url.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            timeout_secs: 5,
            forward_messages: false,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::system("You are a helpful assistant.")],
            request_id: Some("req-7".to_string()),
        }
    }

    #[tokio::test]
    async fn posts_chat_completion_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("x-request-id", "req-7"))
            .and(body_json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "system", "content": "You are a helpful assistant." }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-3.5-turbo-0125",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Hello! How can I help?" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            OpenAiProvider::new(&config(&format!("{}/v1/", server.uri()), Some("sk-test"))).unwrap();
        let response = provider.complete(&request()).await.unwrap();

        assert_eq!(response.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(response.usage.unwrap().total_tokens, 19);
        let message = response.into_first_message().unwrap();
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["content"], "Hello! How can I help?");
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri(), Some("sk-test"))).unwrap();
        let result = provider.complete(&request()).await;

        assert!(matches!(result, Err(ProviderError::RateLimited)));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri(), Some("sk-test"))).unwrap();
        match provider.complete(&request()).await {
            Err(ProviderError::ApiError(message)) => assert!(message.contains("upstream exploded")),
            other => panic!("expected ApiError, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri(), Some("sk-test"))).unwrap();
        assert!(matches!(
            provider.complete(&request()).await,
            Err(ProviderError::ApiError(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri(), None)).unwrap();
        assert!(!provider.is_configured());
        assert!(matches!(
            provider.complete(&request()).await,
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
