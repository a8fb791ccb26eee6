//! Configuration management.
//!
//! Configuration is read once from the environment, after loading an optional
//! `.env` file from the current directory (real environment variables win):
//! - `OPENROUTER_API_KEY` - API key for models routed through OpenRouter.
//! - `OPENAI_API_KEY` - API key for `openai/...` models.
//! - `ANTHROPIC_API_KEY` - API key for `anthropic/...` models.
//! - `LLM_API_KEY` - Optional. Overrides the provider-specific key.
//! - `LLM_MODEL` - Optional. Model id override for the single-model entry points.
//! - `LLM_BASE_URL` - Optional. Chat completions endpoint override.
//! - `WORKSPACE_PATH` - Optional. The workspace directory. Defaults to current directory.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `50`.
//!
//! No credential is required up front: which key is needed depends on the
//! preset being dispatched, so a missing key is reported by [`Config::api_key_for`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::llm::Provider;

/// Generic credential override, checked before the provider's own variable.
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}. Please set it in your .env file or environment.")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Unknown model: {name}. Available: {available:?}")]
    UnknownModel {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("No known provider for model id '{0}' (expected openrouter/, openai/ or anthropic/ prefix)")]
    UnknownProvider(String),
}

/// Process configuration snapshot.
#[derive(Clone)]
pub struct Config {
    /// Provider API keys that were present and non-empty.
    api_keys: HashMap<Provider, String>,

    /// `LLM_API_KEY`, if set.
    llm_api_key: Option<String>,

    /// `LLM_MODEL`, if set.
    pub model_override: Option<String>,

    /// `LLM_BASE_URL`, if set.
    pub base_url: Option<Url>,

    /// Workspace directory for file operations
    pub workspace_path: PathBuf,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,
}

/// Shows which credentials are present, never their values.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<Provider> = Provider::ALL
            .iter()
            .copied()
            .filter(|p| self.api_keys.contains_key(p))
            .collect();
        f.debug_struct("Config")
            .field("api_keys", &providers)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field("model_override", &self.model_override)
            .field("base_url", &self.base_url)
            .field("workspace_path", &self.workspace_path)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Config {
    /// Load `.env` (if any), then read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => tracing::debug!("No .env file found"),
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_keys = Provider::ALL
            .into_iter()
            .filter_map(|provider| get(provider.api_key_env()).map(|key| (provider, key)))
            .collect();

        let base_url = get("LLM_BASE_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidValue("LLM_BASE_URL".to_string(), format!("{}", e))
                })
            })
            .transpose()?;

        let workspace_path = get("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let max_iterations = get("MAX_ITERATIONS")
            .map(|v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_keys,
            llm_api_key: get(LLM_API_KEY_ENV),
            model_override: get("LLM_MODEL"),
            base_url,
            workspace_path,
            max_iterations,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(workspace_path: PathBuf) -> Self {
        Self {
            api_keys: HashMap::new(),
            llm_api_key: None,
            model_override: None,
            base_url: None,
            workspace_path,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set a provider key.
    pub fn with_api_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    /// API key to use for `provider`.
    ///
    /// `LLM_API_KEY` takes precedence; otherwise the provider's own variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` naming the provider's variable when
    /// neither is set.
    pub fn api_key_for(&self, provider: Provider) -> Result<String, ConfigError> {
        if let Some(key) = &self.llm_api_key {
            return Ok(key.clone());
        }
        self.api_keys
            .get(&provider)
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnvVar(provider.api_key_env().to_string()))
    }
}
