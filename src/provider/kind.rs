//! Provider kind enumeration and per-provider defaults.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

use crate::constants::{
    DEFAULT_GEMINI_MODEL, DEFAULT_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENROUTER_MODEL,
    OLLAMA_DEFAULT_MODEL,
};

/// Identifies which LLM provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic (Claude models).
    Anthropic,
    /// OpenAI (GPT models).
    OpenAI,
    /// OpenRouter (multi-provider gateway).
    OpenRouter,
    /// Ollama (local models via OpenAI-compatible API).
    Ollama,
    /// Google Gemini.
    Gemini,
}

impl ProviderKind {
    /// Lowercase name used in config keys, env var prefixes and messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable that overrides the model, e.g. `ANTHROPIC_MODEL`.
    pub fn model_env_var(self) -> String {
        format!("{}_MODEL", self.name().to_uppercase())
    }

    /// Default model identifier for this provider.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => DEFAULT_MODEL,
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
            Self::OpenRouter => DEFAULT_OPENROUTER_MODEL,
            Self::Ollama => OLLAMA_DEFAULT_MODEL,
            Self::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            other => Err(anyhow!(
                "Unknown provider: {other}. Supported: anthropic, openai, openrouter, ollama, gemini"
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
