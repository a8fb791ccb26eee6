//! Dispatch: resolve a preset nickname, build the model, agent and
//! conversation, and run one task to completion.
//!
//! Configuration problems (unknown nickname, missing credential, bad
//! workspace) are reported before any client is built. Failures after that
//! point come from the agent layer and are returned as-is.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::{Agent, Conversation};
use crate::config::{Config, ConfigError};
use crate::llm::{Llm, ModelRoute, OpenRouterClient};
use crate::presets::{self, ModelPreset};
use crate::tools::ToolKind;

/// Task used when the caller does not supply one.
pub const DEFAULT_TASK: &str =
    "List the files in the current directory and write a summary to SUMMARY.txt";

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Task for the agent; [`DEFAULT_TASK`] when unset.
    pub task: Option<String>,
    /// Workspace directory; the configured workspace when unset.
    pub workspace: Option<PathBuf>,
    /// Print progress lines to stdout.
    pub verbose: bool,
    /// Model id replacing the preset's (credential follows the new provider).
    pub model_override: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            task: None,
            workspace: None,
            verbose: true,
            model_override: None,
        }
    }
}

impl RunOptions {
    pub fn task(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            ..Self::default()
        }
    }

    pub fn in_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }
}

/// A preset with its route and credential resolved.
#[derive(Clone)]
pub struct ResolvedPreset {
    pub preset: &'static ModelPreset,
    pub route: ModelRoute,
    /// Variable the credential was expected in.
    pub api_key_env: &'static str,
    api_key: String,
}

impl ResolvedPreset {
    /// Display name: the preset's, or the override id when one was applied.
    pub fn display_name(&self) -> &str {
        if self.route.model_id == self.preset.model_id {
            self.preset.name
        } else {
            &self.route.model_id
        }
    }
}

impl fmt::Debug for ResolvedPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPreset")
            .field("preset", &self.preset.key)
            .field("route", &self.route)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Resolve a nickname to a model route and credential.
///
/// # Errors
///
/// `UnknownModel` for a nickname outside the preset table,
/// `UnknownProvider`/`InvalidValue` for an unroutable override, and
/// `MissingEnvVar` when the credential is absent.
pub fn resolve(
    config: &Config,
    key: &str,
    model_override: Option<&str>,
) -> Result<ResolvedPreset, ConfigError> {
    let preset = presets::lookup(key)?;
    let route = ModelRoute::parse(model_override.unwrap_or(preset.model_id))?;
    let api_key = config.api_key_for(route.provider)?;

    Ok(ResolvedPreset {
        preset,
        api_key_env: route.provider.api_key_env(),
        route,
        api_key,
    })
}

/// Build the model handle for a resolved preset.
pub fn create_llm(config: &Config, resolved: &ResolvedPreset) -> Llm {
    let client = match &config.base_url {
        Some(url) => OpenRouterClient::with_endpoint(url.clone(), resolved.api_key.clone()),
        None => OpenRouterClient::for_provider(resolved.route.provider, resolved.api_key.clone()),
    };
    Llm::with_client(
        resolved.route.clone(),
        resolved.preset.max_output_tokens,
        Arc::new(client),
    )
}

/// Attach the given tools to a model.
pub fn create_agent(llm: Llm, tools: &[ToolKind]) -> Agent {
    Agent::with_tool_kinds(llm, tools)
}

/// Run a task with the preset named `key`, returning the finished conversation.
pub async fn run_agent(
    config: &Config,
    key: &str,
    options: RunOptions,
) -> anyhow::Result<Conversation> {
    let resolved = resolve(config, key, options.model_override.as_deref())?;

    let workspace = options
        .workspace
        .unwrap_or_else(|| config.workspace_path.clone());
    if !workspace.is_dir() {
        return Err(ConfigError::InvalidValue(
            "workspace".to_string(),
            format!("{} is not a directory", workspace.display()),
        )
        .into());
    }

    let task = options.task.unwrap_or_else(|| DEFAULT_TASK.to_string());

    let llm = create_llm(config, &resolved);
    let agent = create_agent(llm, resolved.preset.default_tools);
    let mut conversation =
        Conversation::new(agent, workspace).with_max_iterations(config.max_iterations);

    tracing::info!(
        preset = resolved.preset.key,
        model = %resolved.route,
        workspace = %conversation.workspace().display(),
        "Dispatching task"
    );

    if options.verbose {
        println!("Sending task to agent: {}", task);
        println!(
            "Using model: {} ({})",
            resolved.display_name(),
            resolved.route.model_id
        );
    }

    conversation.send_message(task);
    conversation.run().await?;

    if options.verbose {
        if let Some(response) = conversation.final_response() {
            println!("{}", response);
        }
        println!("All done!");
    }

    Ok(conversation)
}

/// Run a task with GPT-OSS-120B.
pub async fn run_gpt_oss_agent(
    config: &Config,
    options: RunOptions,
) -> anyhow::Result<Conversation> {
    run_agent(config, "gpt-oss", options).await
}

/// Run a task with Qwen3 Coder.
pub async fn run_qwen_agent(
    config: &Config,
    options: RunOptions,
) -> anyhow::Result<Conversation> {
    run_agent(config, "qwen", options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::presets::{MODELS, STANDARD_TOOLS};

    fn config_with_key() -> Config {
        Config::new(std::env::temp_dir()).with_api_key(Provider::OpenRouter, "sk-or-test")
    }

    #[test]
    fn every_preset_resolves() {
        let config = config_with_key();
        for preset in MODELS {
            let resolved = resolve(&config, preset.key, None).unwrap();
            assert!(!resolved.route.model_id.is_empty());
            assert!(!resolved.api_key_env.is_empty());
            assert_eq!(resolved.api_key_env, preset.api_key_env);
        }
    }

    #[test]
    fn literal_model_ids() {
        let config = config_with_key();
        assert_eq!(
            resolve(&config, "qwen", None).unwrap().route.model_id,
            "openrouter/qwen/qwen3-coder"
        );
        assert_eq!(
            resolve(&config, "gpt-oss", None).unwrap().route.model_id,
            "openrouter/openai/gpt-oss-120b"
        );
    }

    #[test]
    fn unknown_nickname_fails() {
        let err = resolve(&config_with_key(), "claude", None).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel { ref name, .. } if name == "claude"));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_network() {
        let config = Config::new(std::env::temp_dir());
        let err = run_agent(&config, "qwen", RunOptions::task("anything").quiet())
            .await
            .unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().expect("configuration error");
        assert!(matches!(config_err, ConfigError::MissingEnvVar(v) if v == "OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn bad_workspace_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = run_agent(
            &config_with_key(),
            "gpt-oss",
            RunOptions::task("anything").in_workspace(missing).quiet(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidValue(k, _)) if k == "workspace"
        ));
    }

    #[test]
    fn override_switches_provider_credential() {
        let config = config_with_key();
        let err = resolve(&config, "qwen", Some("anthropic/claude-sonnet-4-5")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ANTHROPIC_API_KEY"));

        let config = config.with_api_key(Provider::Anthropic, "sk-ant");
        let resolved = resolve(&config, "qwen", Some("anthropic/claude-sonnet-4-5")).unwrap();
        assert_eq!(resolved.route.upstream_model, "claude-sonnet-4-5");
        assert_eq!(resolved.display_name(), "anthropic/claude-sonnet-4-5");
        assert_eq!(resolved.preset.max_output_tokens, 16384);
    }

    #[test]
    fn agent_gets_standard_tools_in_order() {
        let config = config_with_key();
        let resolved = resolve(&config, "gpt-oss", None).unwrap();
        let llm = create_llm(&config, &resolved);
        assert_eq!(llm.max_output_tokens(), 8192);
        assert_eq!(llm.model_id(), "openrouter/openai/gpt-oss-120b");

        let agent = create_agent(llm, resolved.preset.default_tools);
        assert_eq!(agent.tools().len(), 3);
        assert_eq!(agent.tool_names(), vec!["terminal", "file_editor", "task_tracker"]);
        assert_eq!(resolved.preset.default_tools, STANDARD_TOOLS);
    }

    #[test]
    fn debug_redacts_key() {
        let resolved = resolve(&config_with_key(), "qwen", None).unwrap();
        let shown = format!("{:?}", resolved);
        assert!(!shown.contains("sk-or-test"));
        assert!(shown.contains("<redacted>"));
    }
}
