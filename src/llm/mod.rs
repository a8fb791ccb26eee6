//! LLM client module for interacting with language models.
//!
//! This module provides a trait-based abstraction over chat-completion
//! providers. All supported providers speak the OpenAI-compatible wire
//! format, so a single HTTP client serves OpenRouter, OpenAI and Anthropic.

mod error;
mod openrouter;
mod routing;

pub use error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
pub use openrouter::OpenRouterClient;
pub use routing::{ModelRoute, Provider};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a simple text message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant turn that requested tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Result of a tool call, addressed to the call that produced it.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function call details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments as a JSON string. May be empty or missing for no-argument functions.
    #[serde(default)]
    pub arguments: String,
}

/// Tool definition for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Function definition with schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Optional parameters for chat completions.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u64>,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse>;
}

/// A configured language model: route, credentials (held by the client) and
/// output budget.
#[derive(Clone)]
pub struct Llm {
    route: ModelRoute,
    max_output_tokens: u64,
    client: Arc<dyn LlmClient>,
}

impl Llm {
    /// Build an HTTP-backed model handle for `model_id`.
    pub fn new(model_id: &str, api_key: String, max_output_tokens: u64) -> anyhow::Result<Self> {
        let route = ModelRoute::parse(model_id)?;
        let client = OpenRouterClient::for_provider(route.provider, api_key);
        Ok(Self::with_client(route, max_output_tokens, Arc::new(client)))
    }

    /// Build a handle around an existing client.
    pub fn with_client(
        route: ModelRoute,
        max_output_tokens: u64,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            route,
            max_output_tokens,
            client,
        }
    }

    pub fn route(&self) -> &ModelRoute {
        &self.route
    }

    pub fn model_id(&self) -> &str {
        &self.route.model_id
    }

    pub fn max_output_tokens(&self) -> u64 {
        self.max_output_tokens
    }

    /// Run one completion with this model's output budget.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> anyhow::Result<ChatResponse> {
        let options = ChatOptions {
            temperature: None,
            max_tokens: Some(self.max_output_tokens),
        };
        self.client
            .chat_completion(&self.route.upstream_model, messages, tools, options)
            .await
    }
}

impl std::fmt::Debug for Llm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Llm")
            .field("route", &self.route)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_message_shape() {
        let msg = ChatMessage::tool_result("call_1", "ok");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn tool_call_arguments_default_to_empty() {
        let call: ToolCall = serde_json::from_str(
            r#"{"id":"c1","type":"function","function":{"name":"task_tracker"}}"#,
        )
        .unwrap();
        assert_eq!(call.function.arguments, "");
    }

    #[test]
    fn llm_new_rejects_unroutable_model() {
        assert!(Llm::new("qwen3-coder", "key".into(), 100).is_err());
        let llm = Llm::new("openrouter/qwen/qwen3-coder", "key".into(), 16384).unwrap();
        assert_eq!(llm.model_id(), "openrouter/qwen/qwen3-coder");
        assert_eq!(llm.route().upstream_model, "qwen/qwen3-coder");
        assert_eq!(llm.max_output_tokens(), 16384);
    }
}
