//! OpenRouter API client implementation with automatic retry for transient errors.
//!
//! Any OpenAI-compatible chat completions endpoint works; the URL is configurable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter API client with automatic retry for transient errors.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    api_url: String,
    retry_config: RetryConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client with default retry configuration.
    pub fn new(api_key: String) -> Self {
        Self::with_retry_config(api_key, RetryConfig::default())
    }

    /// Create a new OpenRouter client with custom retry configuration.
    pub fn with_retry_config(api_key: String, retry_config: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: OPENROUTER_API_URL.to_string(),
            retry_config,
        }
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Parse Retry-After header if present.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok().map(Duration::from_secs))
    }

    /// Create an LlmError from HTTP response status and body.
    fn create_error(
        status: reqwest::StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> LlmError {
        let status_code = status.as_u16();

        match classify_http_status(status_code) {
            LlmErrorKind::RateLimited => LlmError::rate_limited(body.to_string(), retry_after),
            LlmErrorKind::ClientError => LlmError::client_error(status_code, body.to_string()),
            _ => LlmError::server_error(status_code, body.to_string()),
        }
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, request: &OpenRouterRequest) -> Result<ChatResponse, LlmError> {
        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "CortexMesh A2A Adapter")
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(LlmError::network_error(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(LlmError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(LlmError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network_error(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Self::create_error(status, &body, retry_after));
        }

        parse_completion(&body, &request.model)
    }

    /// Execute a request with automatic retry for transient errors.
    async fn execute_with_retry(
        &self,
        request: &OpenRouterRequest,
    ) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();
        let mut attempt = 0;
        let mut last_error: Option<LlmError> = None;

        loop {
            if start.elapsed() > self.retry_config.max_retry_duration {
                let err = last_error.unwrap_or_else(|| {
                    LlmError::network_error("Max retry duration exceeded".to_string())
                });
                return Err(anyhow::Error::new(err));
            }

            match self.execute_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => {
                    let should_retry = self.retry_config.should_retry(&error)
                        && attempt < self.retry_config.max_retries;

                    if !should_retry {
                        if attempt > 0 {
                            tracing::error!(
                                "Request failed after {} retries (total time: {:?}): {}",
                                attempt,
                                start.elapsed(),
                                error
                            );
                        } else {
                            tracing::error!("Request failed (non-retryable): {}", error);
                        }
                        return Err(anyhow::Error::new(error));
                    }

                    let remaining = self
                        .retry_config
                        .max_retry_duration
                        .saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        tracing::warn!(
                            "Retry attempt {} failed, no time remaining: {}",
                            attempt + 1,
                            error
                        );
                        return Err(anyhow::Error::new(error));
                    }
                    let delay = error.suggested_delay(attempt).min(remaining);

                    tracing::warn!(
                        "Retry attempt {} failed with {}, retrying in {:?}: {}",
                        attempt + 1,
                        error.kind,
                        delay,
                        error.message
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    last_error = Some(error);
                }
            }
        }
    }
}

/// Decode a successful chat completion body.
fn parse_completion(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: OpenRouterResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content,
        finish_reason: choice.finish_reason,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatResponse> {
        self.chat_completion_with_options(model, messages, ChatOptions::default())
            .await
    }

    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = OpenRouterRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
        };

        tracing::debug!("Sending request to {}: model={}", self.api_url, model);

        self.execute_with_retry(&request).await
    }
}

/// OpenRouter API request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    usage: Option<OpenRouterUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const COMPLETION: &str =
        r#"{"choices":[{"message":{"content":"done"},"finish_reason":"stop"}]}"#;

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            max_retry_duration: Duration::from_secs(10),
            ..RetryConfig::default()
        }
    }

    /// Serve chat completions that answer 429 (`Retry-After: 0`) until
    /// `failures` requests have been seen. Returns the URL and hit counter.
    async fn rate_limited_server(failures: usize) -> (String, Arc<AtomicUsize>) {
        async fn handler(
            State((hits, failures)): State<(Arc<AtomicUsize>, usize)>,
        ) -> impl IntoResponse {
            let seen = hits.fetch_add(1, Ordering::SeqCst);
            if seen < failures {
                (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")], "slow").into_response()
            } else {
                (
                    StatusCode::OK,
                    [("content-type", "application/json")],
                    COMPLETION,
                )
                    .into_response()
            }
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/v1/chat/completions", post(handler))
            .with_state((hits.clone(), failures));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1/chat/completions", addr), hits)
    }

    /// Read one full HTTP request (headers plus `Content-Length` body).
    async fn read_request(stream: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn request() -> OpenRouterRequest {
        OpenRouterRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_retries_immediate_rate_limit() {
        let (url, hits) = rate_limited_server(2).await;
        let client =
            OpenRouterClient::with_retry_config("key".into(), fast_retries(3)).with_api_url(url);

        let response = client
            .chat_completion("test-model", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("done"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (url, hits) = rate_limited_server(usize::MAX).await;
        let client =
            OpenRouterClient::with_retry_config("key".into(), fast_retries(2)).with_api_url(url);

        let err = client
            .chat_completion("test-model", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        let err = err.downcast_ref::<LlmError>().unwrap();
        assert_eq!(err.kind, LlmErrorKind::RateLimited);
        assert_eq!(err.message, "slow");
    }

    #[tokio::test]
    async fn test_truncated_body_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"choices\":")
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
            let mut rest = [0u8; 64];
            let _ = stream.read(&mut rest).await;
        });

        let client = OpenRouterClient::with_retry_config("key".into(), RetryConfig::disabled())
            .with_api_url(format!("http://{}/v1/chat/completions", addr));
        let err = client.execute_request(&request()).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::NetworkError);
        assert!(err.message.contains("response body"));
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": "{\"ok\": true}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let response = parse_completion(body, "fallback").unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"ok\": true}"));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(response.usage, Some(TokenUsage::new(10, 5)));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let err = parse_completion(r#"{"choices": []}"#, "m").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[test]
    fn test_parse_completion_falls_back_to_requested_model() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": null}]}"#;
        let response = parse_completion(body, "my-model").unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.model.as_deref(), Some("my-model"));
    }

    #[test]
    fn test_create_error_classification() {
        let err = OpenRouterClient::create_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down",
            Some(Duration::from_secs(3)),
        );
        assert_eq!(err.kind, LlmErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(Duration::from_secs(3)));

        let err = OpenRouterClient::create_error(reqwest::StatusCode::BAD_GATEWAY, "", None);
        assert_eq!(err.kind, LlmErrorKind::ServerError);
        assert_eq!(err.status_code, Some(502));

        let err = OpenRouterClient::create_error(reqwest::StatusCode::UNAUTHORIZED, "", None);
        assert_eq!(err.kind, LlmErrorKind::ClientError);
    }

    #[test]
    fn test_custom_api_url() {
        let client = OpenRouterClient::new("key".into()).with_api_url("http://localhost:9999/v1");
        assert_eq!(client.api_url(), "http://localhost:9999/v1");
    }
}
