//! Connectivity smoke test: one prompt straight through the LLM client, no
//! agent and no tools.

use crate::config::Config;
use crate::llm::{
    ChatMessage, ChatOptions, LlmClient, ModelRoute, OpenRouterClient, Role, TokenUsage,
};

/// Model pinged when `LLM_MODEL` is unset.
pub const DEFAULT_PING_MODEL: &str = "openrouter/qwen/qwen3-coder";

pub const PING_PROMPT: &str = "Say 'Hello from Qwen3 Coder!' in exactly 5 words.";

const PING_MAX_TOKENS: u64 = 50;

/// Outcome of a ping.
#[derive(Debug, Clone)]
pub struct PingReport {
    /// Model id that was requested.
    pub requested_model: String,
    /// Model name reported by the provider.
    pub model: Option<String>,
    pub reply: String,
    pub usage: Option<TokenUsage>,
}

/// Model id the ping will use.
pub fn ping_model(config: &Config) -> &str {
    config.model_override.as_deref().unwrap_or(DEFAULT_PING_MODEL)
}

/// Send [`PING_PROMPT`] to the configured model.
///
/// Credential and routing problems surface as configuration errors before
/// any request is made.
pub async fn ping(config: &Config) -> anyhow::Result<PingReport> {
    let route = ModelRoute::parse(ping_model(config))?;
    let api_key = config.api_key_for(route.provider)?;

    let client = match &config.base_url {
        Some(url) => OpenRouterClient::with_endpoint(url.clone(), api_key),
        None => OpenRouterClient::for_provider(route.provider, api_key),
    };

    ping_with(&client, &route).await
}

/// Ping through an existing client.
pub async fn ping_with(client: &dyn LlmClient, route: &ModelRoute) -> anyhow::Result<PingReport> {
    tracing::info!(model = %route, "Pinging routing API");

    let messages = [ChatMessage::new(Role::User, PING_PROMPT)];
    let options = ChatOptions {
        temperature: None,
        max_tokens: Some(PING_MAX_TOKENS),
    };

    let response = client
        .chat_completion(&route.upstream_model, &messages, None, options)
        .await?;

    Ok(PingReport {
        requested_model: route.model_id.clone(),
        model: response.model,
        reply: response.content.unwrap_or_default(),
        usage: response.usage,
    })
}
