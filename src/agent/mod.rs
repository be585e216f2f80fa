//! The reasoning loop: ask the model, act on its answer, feed back the result.
//!
//! [`AgentLoop`] owns nothing but borrowed collaborators. Each call to
//! [`AgentLoop::run`] builds a fresh [`Conversation`] for the task and drops
//! it when the task ends, whatever the outcome.

pub mod parser;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::approval::ApprovalGate;
use crate::constants::{FORMAT_CORRECTION, MAX_AGENT_ITERATIONS, MAX_ITERATIONS_SENTINEL};
use crate::error::AgentError;
use crate::message::Conversation;
use crate::output::{NullRenderer, Renderer};
use crate::provider::Chat;
use crate::tools::ToolRegistry;

use parser::TurnKind;

static NULL_RENDERER: NullRenderer = NullRenderer;

/// Drives one task at a time against a chat backend and a tool registry.
pub struct AgentLoop<'a> {
    chat: &'a dyn Chat,
    tools: &'a ToolRegistry,
    gate: &'a dyn ApprovalGate,
    renderer: &'a dyn Renderer,
    system_prompt: String,
    max_iterations: usize,
}

impl<'a> AgentLoop<'a> {
    pub fn new(chat: &'a dyn Chat, tools: &'a ToolRegistry, gate: &'a dyn ApprovalGate) -> Self {
        Self {
            chat,
            tools,
            gate,
            renderer: &NULL_RENDERER,
            system_prompt: String::new(),
            max_iterations: MAX_AGENT_ITERATIONS,
        }
    }

    pub fn with_renderer(mut self, renderer: &'a dyn Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs `task` to completion.
    ///
    /// Returns the final answer, or the iteration-limit sentinel. Errors are
    /// limited to cancellation and chat backend failures.
    pub async fn run(&self, task: &str, cancel: &CancellationToken) -> Result<String, AgentError> {
        let span = info_span!("task", id = %Uuid::new_v4());
        async move {
            info!(max_iterations = self.max_iterations, "task started");
            let mut conversation = Conversation::new(task);
            let result = self.drive(&mut conversation, cancel).await;
            match &result {
                Ok(_) => info!(messages = conversation.len(), "task finished"),
                Err(AgentError::Cancelled) => info!("task cancelled"),
                Err(e) => warn!(error = %e, "task failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            debug!(iteration, "requesting model response");

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                response = self.chat.chat(conversation.messages(), &self.system_prompt, cancel) => {
                    response.map_err(AgentError::Chat)?
                }
            };

            let turn = parser::parse(&response);
            if let Some(ref thought) = turn.thought {
                self.renderer.thought(thought);
            }

            if let Some(call) = turn.action() {
                if matches!(turn.kind, TurnKind::AnswerWithAction { .. }) {
                    debug!(iteration, "answer ignored in favour of action");
                }
                debug!(iteration, tool = %call.name, "dispatching action");
                self.renderer.action(call);
                let observation = self.tools.dispatch(call, self.gate, cancel).await?;
                self.renderer.observation(&observation);
                conversation.record_exchange(response, &observation);
                continue;
            }

            match turn.kind {
                TurnKind::Answer(answer) => {
                    debug!(iteration, "turn is a final answer");
                    return Ok(answer);
                }
                _ => {
                    debug!(iteration, "turn had no action or answer");
                    self.renderer.format_error(FORMAT_CORRECTION);
                    conversation.record_exchange(response, FORMAT_CORRECTION);
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "iteration limit reached");
        Ok(MAX_ITERATIONS_SENTINEL.to_string())
    }
}
