//! Struct definitions for embryo configuration.

use serde::{Deserialize, Serialize};

use crate::approval::PermissionConfig;

/// Root configuration for embryo, deserialized from `config.toml`.
///
/// Every field is optional so embryo runs with sensible defaults when no
/// config file exists.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Model identifier (e.g. `"gpt-4o"`), optionally as `provider/model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Default provider name (e.g., "anthropic", "gemini").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    /// Iterations a task may take before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    /// Timeout for `execute_command`, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    /// Log filter used when `RUST_LOG` and `--verbose` are absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Per-tool permission levels.
    #[serde(default)]
    pub permissions: PermissionConfig,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<ProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProviderEntry {
    /// API key for authentication. Environment variables take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom base URL (used by Ollama).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model to use with this provider, overriding the global `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderEntry {
    /// Field-wise overlay; `over` wins where set.
    pub(super) fn overlay(base: Option<Self>, over: Option<Self>) -> Option<Self> {
        match (base, over) {
            (Some(base), Some(over)) => Some(Self {
                api_key: over.api_key.or(base.api_key),
                base_url: over.base_url.or(base.base_url),
                model: over.model.or(base.model),
            }),
            (base, over) => over.or(base),
        }
    }
}
