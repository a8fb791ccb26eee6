//! Model routing: split a `provider/model` id into an endpoint and the
//! upstream model name sent on the wire.
//!
//! Ids follow the LiteLLM convention, so `openrouter/qwen/qwen3-coder` goes to
//! OpenRouter as `qwen/qwen3-coder`.

use std::fmt;

use crate::config::ConfigError;

/// Hosted service a model id routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenRouter,
    OpenAi,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenRouter, Provider::OpenAi, Provider::Anthropic];

    /// Prefix used in model ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// OpenAI-compatible chat completions endpoint.
    pub fn chat_completions_url(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/chat/completions",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.prefix() == prefix)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A parsed model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub provider: Provider,
    /// Model name as the provider expects it (prefix stripped).
    pub upstream_model: String,
    /// The id as written, e.g. `openrouter/openai/gpt-oss-120b`.
    pub model_id: String,
}

impl ModelRoute {
    pub fn parse(model_id: &str) -> Result<Self, ConfigError> {
        let model_id = model_id.trim();
        let (prefix, rest) = model_id
            .split_once('/')
            .ok_or_else(|| ConfigError::UnknownProvider(model_id.to_string()))?;

        let provider = Provider::from_prefix(prefix)
            .ok_or_else(|| ConfigError::UnknownProvider(model_id.to_string()))?;

        if rest.is_empty() {
            return Err(ConfigError::InvalidValue(
                "model".to_string(),
                format!("'{}' names a provider but no model", model_id),
            ));
        }

        Ok(Self {
            provider,
            upstream_model: rest.to_string(),
            model_id: model_id.to_string(),
        })
    }
}

impl fmt::Display for ModelRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model_id)
    }
}
