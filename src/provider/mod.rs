//! LLM provider abstraction for embryo.
//!
//! The agent loop only sees the [`Chat`] trait. [`Provider`] implements it by
//! wrapping rig-core's clients behind enum dispatch, so provider-specific
//! details stay out of the loop and the CLI. Supports Anthropic, OpenAI,
//! OpenRouter, Ollama (local) and Gemini via [`ProviderKind`].

mod client;
mod kind;
mod resolve;

use tokio_util::sync::CancellationToken;

use crate::message::Message;

pub use client::Provider;
pub use kind::ProviderKind;
pub use resolve::{env_var, resolve_model, ModelSelection};

/// A chat backend: full history plus system prompt in, reply text out.
///
/// Implementations should return provider failures as text where they can.
/// An `Err` ends the task.
#[async_trait::async_trait]
pub trait Chat: Send + Sync {
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<String>;
}
