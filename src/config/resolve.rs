//! Environment variable substitution and effective-value accessors.

use std::time::Duration;

use super::types::{Config, ProviderEntry};
use crate::constants::{COMMAND_DEFAULT_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, MAX_AGENT_ITERATIONS};
use crate::provider::ProviderKind;

impl Config {
    /// Resolve `{env:VAR_NAME}` patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self, env: &impl Fn(&str) -> Option<String>) {
        for field in [
            &mut self.model,
            &mut self.default_provider,
            &mut self.log_level,
        ] {
            if let Some(value) = field {
                *value = resolve_str(value, env);
            }
        }
        for entry in [
            &mut self.provider.anthropic,
            &mut self.provider.openai,
            &mut self.provider.openrouter,
            &mut self.provider.ollama,
            &mut self.provider.gemini,
        ] {
            if let Some(e) = entry {
                for value in [&mut e.api_key, &mut e.base_url, &mut e.model]
                    .into_iter()
                    .flatten()
                {
                    *value = resolve_str(value, env);
                }
            }
        }
    }

    pub fn provider_entry(&self, kind: ProviderKind) -> Option<&ProviderEntry> {
        match kind {
            ProviderKind::Anthropic => self.provider.anthropic.as_ref(),
            ProviderKind::OpenAI => self.provider.openai.as_ref(),
            ProviderKind::OpenRouter => self.provider.openrouter.as_ref(),
            ProviderKind::Ollama => self.provider.ollama.as_ref(),
            ProviderKind::Gemini => self.provider.gemini.as_ref(),
        }
    }

    /// Resolve the API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        let env_key = format!("{}_API_KEY", kind.name().to_uppercase());
        crate::provider::env_var(&env_key).or_else(|| {
            self.provider_entry(kind)
                .and_then(|e| e.api_key.clone())
                .filter(|k| !k.is_empty())
        })
    }

    /// The configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref().filter(|p| !p.is_empty())
    }

    /// The configured model with any `provider/` prefix removed.
    pub fn model_name(&self) -> Option<String> {
        let model = self.model.as_deref().filter(|m| !m.is_empty())?;
        Some(match model.split_once('/') {
            Some((_provider, model)) => model.to_string(),
            None => model.to_string(),
        })
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
            .filter(|&n| n > 0)
            .unwrap_or(MAX_AGENT_ITERATIONS)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.unwrap_or(COMMAND_DEFAULT_TIMEOUT_SECS))
    }

    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        for entry in [
            &mut config.provider.anthropic,
            &mut config.provider.openai,
            &mut config.provider.openrouter,
            &mut config.provider.ollama,
            &mut config.provider.gemini,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(ref mut key) = entry.api_key {
                if !key.is_empty() {
                    *key = "********".to_string();
                }
            }
        }
        config
    }
}

/// Replace each `{env:VAR}` with the variable's value (empty when unset).
///
/// Substituted values are copied as-is and never rescanned.
fn resolve_str(s: &str, env: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{env:") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 5..start + end];
        result.push_str(&env(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}
