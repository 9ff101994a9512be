use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::model::{ChatModel, ChatRequest};
use crate::types::*;

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60000;

/// Backoff settings for rate-limited or failing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
        }
    }
}

/// Client for OpenAI-compatible chat-completion APIs
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl ChatClient {
    pub fn new(api_key: String, config: &LlmConfig) -> LlmResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.effective_base_url(),
            model: config.effective_model().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::default(),
        })
    }

    /// Build a client whose API key comes from the configured environment variable.
    pub fn from_env(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(api_key, config)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn with_retry<T, F, Fut>(&self, operation: F, operation_name: &str) -> LlmResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = LlmResult<T>>,
    {
        let mut retries = 0;
        let mut backoff_ms = self.retry.initial_backoff_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() => {
                    if retries >= self.retry.max_retries {
                        error!(
                            "{} failed after {} retries: {}",
                            operation_name, retries, e
                        );
                        return Err(e);
                    }

                    let wait_ms = match e {
                        LlmError::RateLimited {
                            retry_after: Some(secs),
                        } => secs * 1000,
                        _ => backoff_ms,
                    }
                    .min(self.retry.max_backoff_ms);

                    warn!(
                        "{} failed ({}), retrying in {}ms (attempt {}/{})",
                        operation_name,
                        e,
                        wait_ms,
                        retries + 1,
                        self.retry.max_retries
                    );

                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(self.retry.max_backoff_ms);
                }
                Err(e) => {
                    if retries > 0 {
                        info!(
                            "{} failed after {} retries: {}",
                            operation_name, retries, e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> LlmResult<String> {
        self.with_retry(
            || async {
                self.chat_completion_inner(messages.clone(), temperature, max_tokens)
                    .await
            },
            "chat_completion",
        )
        .await
    }

    async fn chat_completion_inner(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> LlmResult<String> {
        debug!(
            "Creating chat completion with {} messages, model {}",
            messages.len(),
            self.model
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
            stream: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                warn!(retry_after = ?retry_after, "Rate limited by provider");
                return Err(LlmError::RateLimited { retry_after });
            }

            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ProviderErrorBody>(&error_text) {
                error!(
                    "Provider API error: {} (type: {:?})",
                    error_resp.error.message, error_resp.error.error_type
                );
                return Err(LlmError::Api {
                    message: error_resp.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(LlmError::Api {
                message: error_text,
                status_code: Some(status.as_u16()),
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        if let Some(ref usage) = chat_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion usage"
            );
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn generate(&self, request: ChatRequest) -> LlmResult<String> {
        let temperature = request.temperature.unwrap_or(self.temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.max_tokens);
        self.chat_completion(request.to_messages(), Some(temperature), Some(max_tokens))
            .await
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    fn client_for(server: &MockServer) -> ChatClient {
        let config = LlmConfig {
            base_url: Some(format!("{}/v1", server.uri())),
            ..Default::default()
        };
        ChatClient::new("test-key".to_string(), &config)
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
    }

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new("test-key".to_string(), &LlmConfig::default()).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(client.model(), "llama-3.1-8b-instant");
    }

    #[tokio::test]
    async fn test_generate_sends_system_and_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 800,
                "messages": [
                    {"role": "system", "content": "plan"},
                    {"role": "user", "content": "query"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("[]")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client
            .generate(
                ChatRequest::new("query")
                    .with_system("plan")
                    .with_max_tokens(800),
            )
            .await
            .unwrap();
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client.generate(ChatRequest::new("hi")).await.unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client.generate(ChatRequest::new("hi")).await {
            Err(LlmError::Api { status_code, .. }) => assert_eq!(status_code, Some(503)),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client.generate(ChatRequest::new("hi")).await {
            Err(LlmError::Api {
                message,
                status_code,
            }) => {
                assert_eq!(message, "Invalid API Key");
                assert_eq!(status_code, Some(401));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.generate(ChatRequest::new("hi")).await,
            Err(LlmError::EmptyResponse)
        ));
    }
}
