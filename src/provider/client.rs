//! LLM provider client.
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch and implements [`Chat`] for the agent loop.

use anyhow::{Context, Result};
use rig::client::CompletionClient;
use rig::completion::Chat as _;
use rig::message::Message as RigMessage;
use rig::providers::{anthropic, gemini, openai, openrouter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::kind::ProviderKind;
use super::resolve::{env_var, ModelSelection};
use super::Chat;
use crate::config::Config;
use crate::constants::{MAX_TOKENS, OLLAMA_DEFAULT_BASE_URL};
use crate::message::{Message, Role};

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::Client),
    Gemini(gemini::Client),
}

/// A configured LLM provider ready to handle chat requests.
///
/// Agents are built per call; they are cheap and the system prompt is
/// supplied by the caller each time.
pub struct Provider {
    client: ClientKind,
    kind: ProviderKind,
    model: String,
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
            ClientKind::Gemini($client) => $body,
        }
    };
}

impl Provider {
    /// Creates a new [`Provider`] for `selection`.
    ///
    /// API keys come from the environment first, then the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let kind = selection.provider;
        let missing_key = || {
            format!(
                "No API key found for {kind}. Set {}_API_KEY or configure it in config.toml",
                kind.name().to_uppercase()
            )
        };
        let client = match kind {
            ProviderKind::Anthropic => {
                let api_key = config.resolve_api_key(kind).with_context(missing_key)?;
                ClientKind::Anthropic(
                    anthropic::Client::new(&api_key)
                        .context("Failed to create Anthropic client")?,
                )
            }
            ProviderKind::OpenAI => {
                let api_key = config.resolve_api_key(kind).with_context(missing_key)?;
                ClientKind::OpenAI(
                    openai::Client::new(&api_key).context("Failed to create OpenAI client")?,
                )
            }
            ProviderKind::OpenRouter => {
                let api_key = config.resolve_api_key(kind).with_context(missing_key)?;
                ClientKind::OpenRouter(
                    openrouter::Client::new(&api_key)
                        .context("Failed to create OpenRouter client")?,
                )
            }
            ProviderKind::Gemini => {
                let api_key = config.resolve_api_key(kind).with_context(missing_key)?;
                ClientKind::Gemini(
                    gemini::Client::new(&api_key).context("Failed to create Gemini client")?,
                )
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .provider_entry(kind)
                    .and_then(|o| o.base_url.clone())
                    .or_else(|| env_var("OLLAMA_HOST"))
                    .unwrap_or_else(|| OLLAMA_DEFAULT_BASE_URL.to_string());
                let client = openai::Client::builder()
                    .api_key("ollama")
                    .base_url(format!("{}/v1", base_url.trim_end_matches('/')))
                    .build()
                    .context("Failed to create Ollama client")?;
                ClientKind::Ollama(client)
            }
        };

        debug!(provider = %kind, model = %selection.model, "provider ready");
        Ok(Self {
            client,
            kind,
            model: selection.model.clone(),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the whole conversation and returns the model's reply.
    ///
    /// The last message is the prompt; everything before it is history.
    async fn complete(&self, history: &[Message], system_prompt: &str) -> Result<String> {
        let (last, earlier) = history
            .split_last()
            .context("cannot chat with an empty conversation")?;
        let prompt = last.text().to_string();
        let chat_history: Vec<RigMessage> = earlier.iter().map(to_rig_message).collect();

        dispatch!(self, |client| {
            let agent = client
                .agent(&self.model)
                .preamble(system_prompt)
                .max_tokens(MAX_TOKENS)
                .build();
            Ok(agent.chat(prompt.clone(), chat_history.clone()).await?)
        })
    }
}

#[async_trait::async_trait]
impl Chat for Provider {
    /// Provider failures are returned as text so the loop can recover.
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        _cancel: &CancellationToken,
    ) -> Result<String> {
        debug!(provider = %self.kind, messages = history.len(), "chat request");
        match self.complete(history, system_prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(provider = %self.kind, error = %e, "chat request failed");
                Ok(format!("Error calling {}: {e:#}", self.kind))
            }
        }
    }
}

/// Model turns become assistant messages; everything else is user input.
fn to_rig_message(msg: &Message) -> RigMessage {
    match msg.role {
        Role::User => RigMessage::user(msg.text()),
        Role::Model => RigMessage::assistant(msg.text()),
    }
}
