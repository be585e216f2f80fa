//! Provider and model resolution.
//!
//! Resolves which provider and model to use from CLI flags, the config file,
//! the environment and hardcoded defaults. Supports `provider/model` shorthand.

use anyhow::Result;

use super::kind::ProviderKind;
use crate::config::Config;
use crate::constants::DEFAULT_PROVIDER;

/// Env vars checked in order when nothing names a provider.
const DETECTION_ORDER: &[(&str, ProviderKind)] = &[
    ("ANTHROPIC_API_KEY", ProviderKind::Anthropic),
    ("OPENAI_API_KEY", ProviderKind::OpenAI),
    ("OLLAMA_MODEL", ProviderKind::Ollama),
    ("GEMINI_API_KEY", ProviderKind::Gemini),
];

/// Resolved provider + model pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Non-empty value of an environment variable.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve which provider and model to use from the process environment.
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    resolve_model_with(cli_provider, cli_model, config, env_var)
}

/// Resolve which provider and model to use.
///
/// Provider priority: CLI flag > config `default_provider` > first detected
/// env var > anthropic. Model priority: CLI flag > the provider's config
/// entry > config `model` > `{PROVIDER}_MODEL` > the provider's default.
///
/// `--model provider/model` is shorthand when `--provider` is omitted; with
/// an explicit `--provider` the slash stays part of the model name.
pub fn resolve_model_with(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ModelSelection> {
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            return Ok(ModelSelection {
                provider: prov.parse()?,
                model: model.to_string(),
            });
        }
    }

    let provider = match cli_provider.or(config.provider_name()) {
        Some(name) => name.parse()?,
        None => detect_provider(&env).unwrap_or(DEFAULT_PROVIDER.parse()?),
    };

    let model = cli_model
        .map(String::from)
        .or_else(|| config.provider_entry(provider).and_then(|e| e.model.clone()))
        .or_else(|| config.model_name())
        .or_else(|| env(&provider.model_env_var()))
        .unwrap_or_else(|| provider.default_model().to_string());

    Ok(ModelSelection { provider, model })
}

fn detect_provider(env: &impl Fn(&str) -> Option<String>) -> Option<ProviderKind> {
    DETECTION_ORDER
        .iter()
        .find(|(var, _)| env(var).is_some())
        .map(|&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_to_anthropic() {
        let sel = resolve_model_with(None, None, &Config::default(), env_of(&[])).unwrap();
        assert_eq!(sel.provider, ProviderKind::Anthropic);
        assert_eq!(sel.model, crate::constants::DEFAULT_MODEL);
    }

    #[test]
    fn test_detection_order() {
        let env = env_of(&[("GEMINI_API_KEY", "g"), ("OPENAI_API_KEY", "o")]);
        let sel = resolve_model_with(None, None, &Config::default(), env).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, "gpt-4o");
    }

    #[test]
    fn test_ollama_detected_from_model_var() {
        let env = env_of(&[("OLLAMA_MODEL", "qwen2.5")]);
        let sel = resolve_model_with(None, None, &Config::default(), env).unwrap();
        assert_eq!(sel.provider, ProviderKind::Ollama);
        assert_eq!(sel.model, "qwen2.5");
    }

    #[test]
    fn test_cli_beats_config_and_env() {
        let config = Config {
            default_provider: Some("openai".into()),
            ..Config::default()
        };
        let env = env_of(&[("ANTHROPIC_API_KEY", "a")]);
        let sel = resolve_model_with(Some("gemini"), None, &config, env).unwrap();
        assert_eq!(sel.provider, ProviderKind::Gemini);
        assert_eq!(sel.model, crate::constants::DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_config_beats_env_detection() {
        let config = Config {
            default_provider: Some("openrouter".into()),
            ..Config::default()
        };
        let env = env_of(&[("ANTHROPIC_API_KEY", "a")]);
        let sel = resolve_model_with(None, None, &config, env).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenRouter);
    }

    #[test]
    fn test_shorthand() {
        let sel =
            resolve_model_with(None, Some("openai/gpt-4.1"), &Config::default(), env_of(&[]))
                .unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, "gpt-4.1");
    }

    #[test]
    fn test_slash_kept_with_explicit_provider() {
        let sel = resolve_model_with(
            Some("openrouter"),
            Some("meta-llama/llama-3-70b"),
            &Config::default(),
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(sel.model, "meta-llama/llama-3-70b");
    }

    #[test]
    fn test_model_env_override() {
        let env = env_of(&[("ANTHROPIC_API_KEY", "a"), ("ANTHROPIC_MODEL", "claude-x")]);
        let sel = resolve_model_with(None, None, &Config::default(), env).unwrap();
        assert_eq!(sel.model, "claude-x");
    }

    #[test]
    fn test_unknown_provider_errors() {
        assert!(resolve_model_with(Some("bard"), None, &Config::default(), env_of(&[])).is_err());
    }
}
