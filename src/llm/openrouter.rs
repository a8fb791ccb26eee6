//! OpenAI-compatible chat completions client with automatic retry for
//! transient errors. OpenRouter is the default endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

use super::error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
use super::routing::Provider;
use super::{
    ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage, ToolCall, ToolDefinition,
};

/// Chat completions client with automatic retry for transient errors.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry_config: RetryConfig,
}

impl OpenRouterClient {
    /// Create a client for OpenRouter with default retry configuration.
    pub fn new(api_key: String) -> Self {
        Self::for_provider(Provider::OpenRouter, api_key)
    }

    /// Create a client for a provider's OpenAI-compatible endpoint.
    pub fn for_provider(provider: Provider, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: provider.chat_completions_url().to_string(),
            api_key,
            retry_config: RetryConfig::default(),
        }
    }

    /// Create a client for an arbitrary chat completions endpoint.
    pub fn with_endpoint(endpoint: Url, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key,
            retry_config: RetryConfig::default(),
        }
    }

    /// Replace the retry configuration.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
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
            // 503s commonly carry Retry-After too
            _ => LlmError {
                retry_after,
                ..LlmError::server_error(status_code, body.to_string())
            },
        }
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/routed-agent")
            .header("X-Title", "routed-agent")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network_error(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::network_error(format!("Connection failed: {}", e))
                } else {
                    LlmError::network_error(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.map_err(|e| {
            LlmError::network_error(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(Self::create_error(status, &body, retry_after));
        }

        parse_response(&body, &request.model)
    }

    /// Execute a request with automatic retry for transient errors.
    async fn execute_with_retry(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
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
                        return Err(error.into());
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
                        return Err(error.into());
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
                }
            }
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!("Sending request to {}: model={}", self.endpoint, model);

        self.execute_with_retry(&request).await
    }
}

/// Decode a successful chat completions body.
fn parse_response(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls,
        finish_reason: choice.finish_reason,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use crate::llm::Role;

    const OK_BODY: &str =
        r#"{"choices": [{"message": {"content": "pong"}, "finish_reason": "stop"}]}"#;

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            concat!(
                "HTTP/1.1 {}\r\n",
                "Content-Type: application/json\r\n",
                "Content-Length: {}\r\n",
                "Connection: close\r\n",
                "{}\r\n{}"
            ),
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    /// Read one request, headers and body.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }

    /// Local server answering one connection per canned response, in order.
    /// Returns the endpoint and a counter of requests received.
    async fn serve(responses: Vec<String>) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let url = Url::parse(&format!("http://{}/v1/chat/completions", addr)).unwrap();
        (url, hits)
    }

    async fn ask(client: &OpenRouterClient) -> anyhow::Result<ChatResponse> {
        let messages = [ChatMessage::new(Role::User, "ping")];
        client
            .chat_completion("qwen/qwen3-coder", &messages, None, ChatOptions::default())
            .await
    }

    #[test]
    fn endpoints_follow_provider() {
        let client = OpenRouterClient::new("k".into());
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");

        let client = OpenRouterClient::for_provider(Provider::OpenAi, "k".into());
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");

        let url = Url::parse("http://localhost:4000/v1/chat/completions").unwrap();
        let client = OpenRouterClient::with_endpoint(url, "k".into());
        assert_eq!(client.endpoint(), "http://localhost:4000/v1/chat/completions");
    }

    #[test]
    fn request_omits_unset_fields() {
        let request = ChatRequest {
            model: "qwen/qwen3-coder".into(),
            messages: vec![ChatMessage::new(Role::User, "hi")],
            tools: None,
            tool_choice: None,
            temperature: None,
            max_tokens: Some(50),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "qwen/qwen3-coder");
        assert_eq!(value["max_tokens"], 50);
        assert!(value.get("tools").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn parses_text_response_with_usage() {
        let body = r#"{
            "model": "qwen/qwen3-coder",
            "choices": [{
                "message": {"content": "Hello from Qwen3 Coder friend"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 21, "completion_tokens": 7, "total_tokens": 28}
        }"#;
        let response = parse_response(body, "ignored").unwrap();
        assert_eq!(response.content.as_deref(), Some("Hello from Qwen3 Coder friend"));
        assert_eq!(response.usage, Some(TokenUsage::new(21, 7)));
        assert_eq!(response.model.as_deref(), Some("qwen/qwen3-coder"));
    }

    #[test]
    fn parses_tool_calls_and_falls_back_to_requested_model() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{"id": "call_1", "type": "function",
                        "function": {"name": "terminal", "arguments": "{\"command\":\"ls\"}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let response = parse_response(body, "openai/gpt-oss-120b").unwrap();
        let calls = response.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "terminal");
        assert_eq!(response.model.as_deref(), Some("openai/gpt-oss-120b"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let err = parse_response(r#"{"choices": []}"#, "m").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[tokio::test]
    async fn retries_server_error_then_succeeds() {
        let (url, hits) = serve(vec![
            http_response("503 Service Unavailable", "Retry-After: 0\r\n", "busy"),
            http_response("200 OK", "", OK_BODY),
        ])
        .await;
        let client = OpenRouterClient::with_endpoint(url, "k".into()).with_retry_config(
            RetryConfig {
                max_retries: 2,
                max_retry_duration: Duration::from_secs(10),
            },
        );

        let response = ask(&client).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("pong"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (url, hits) = serve(vec![
            http_response("401 Unauthorized", "", r#"{"error": "invalid key"}"#),
            http_response("200 OK", "", OK_BODY),
        ])
        .await;
        let client = OpenRouterClient::with_endpoint(url, "bad".into());

        let err = ask(&client).await.unwrap_err();
        let llm_err = err.downcast_ref::<LlmError>().unwrap();
        assert_eq!(llm_err.kind, LlmErrorKind::ClientError);
        assert_eq!(llm_err.status_code, Some(401));
        assert!(llm_err.message.contains("invalid key"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_at_max_retries() {
        let unavailable =
            http_response("503 Service Unavailable", "Retry-After: 0\r\n", "busy");
        let (url, hits) = serve(vec![unavailable; 4]).await;
        let client = OpenRouterClient::with_endpoint(url, "k".into()).with_retry_config(
            RetryConfig {
                max_retries: 1,
                max_retry_duration: Duration::from_secs(10),
            },
        );

        let err = ask(&client).await.unwrap_err();
        let llm_err = err.downcast_ref::<LlmError>().unwrap();
        assert_eq!(llm_err.kind, LlmErrorKind::ServerError);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_stop_when_time_budget_is_spent() {
        let unavailable =
            http_response("503 Service Unavailable", "Retry-After: 0\r\n", "busy");
        let (url, hits) = serve(vec![unavailable; 4]).await;
        let client = OpenRouterClient::with_endpoint(url, "k".into()).with_retry_config(
            RetryConfig {
                max_retries: 3,
                max_retry_duration: Duration::ZERO,
            },
        );

        assert!(ask(&client).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
