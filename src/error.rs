//! Error types at the loop and tool boundaries.
//!
//! Everything the model can recover from is folded into an observation string
//! before it reaches these types. What is left is cancellation, which callers
//! must be able to tell apart, and failures of the chat backend itself.

use thiserror::Error;

/// Why a task ended without a final text.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The task's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The chat backend raised instead of returning an error string.
    #[error("chat request failed: {0:#}")]
    Chat(anyhow::Error),
}

impl AgentError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure raised by a tool body.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool observed cancellation and stopped.
    #[error("tool call cancelled")]
    Cancelled,

    /// Any other failure; the registry turns it into an observation.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
