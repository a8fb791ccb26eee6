//! Pre-configured models, selected by nickname.

use crate::config::ConfigError;
use crate::tools::ToolKind;

/// Tools every coding preset gets, in the order they are offered.
pub const STANDARD_TOOLS: &[ToolKind] = &[
    ToolKind::Terminal,
    ToolKind::FileEditor,
    ToolKind::TaskTracker,
];

/// A named model configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreset {
    /// Nickname used on dispatch calls.
    pub key: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Routed model id, `provider/model`.
    pub model_id: &'static str,
    /// Environment variable holding the credential.
    pub api_key_env: &'static str,
    pub max_output_tokens: u64,
    pub description: &'static str,
    pub default_tools: &'static [ToolKind],
}

pub const MODELS: &[ModelPreset] = &[
    ModelPreset {
        key: "gpt-oss",
        name: "GPT-OSS-120B",
        model_id: "openrouter/openai/gpt-oss-120b",
        api_key_env: "OPENROUTER_API_KEY",
        max_output_tokens: 8192,
        description: "OpenAI's open-weight MoE model (117B total, 5.1B activated), 131k context. Cost-effective: $0.039/M input, $0.19/M output",
        default_tools: STANDARD_TOOLS,
    },
    ModelPreset {
        key: "qwen",
        name: "Qwen3 Coder",
        model_id: "openrouter/qwen/qwen3-coder",
        api_key_env: "OPENROUTER_API_KEY",
        max_output_tokens: 16384,
        description: "Qwen3 Coder 480B (35B activated). High quality: $0.22/M input, $0.95/M output",
        default_tools: STANDARD_TOOLS,
    },
];

/// All preset nicknames.
pub fn nicknames() -> Vec<&'static str> {
    MODELS.iter().map(|m| m.key).collect()
}

/// Look a preset up by nickname.
///
/// # Errors
///
/// Returns `ConfigError::UnknownModel` listing the available nicknames.
pub fn lookup(key: &str) -> Result<&'static ModelPreset, ConfigError> {
    MODELS
        .iter()
        .find(|m| m.key == key)
        .ok_or_else(|| ConfigError::UnknownModel {
            name: key.to_string(),
            available: nicknames(),
        })
}
