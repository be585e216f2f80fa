//! Centralized constants for embryo.
//!
//! All magic numbers, fixed observation strings, and configuration defaults
//! live here so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "embryo";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "embryo.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "prompt_history.txt";

// --- Provider defaults ---

/// Provider used when nothing is configured or detected.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Default model identifier for Anthropic.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// Default model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Default model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o";

/// Default model identifier for Gemini.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default LLM model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 4096;

// --- Loop ---

/// Iterations a task may take before the loop gives up.
pub const MAX_AGENT_ITERATIONS: usize = 15;

/// Returned when the iteration bound is reached without an answer.
pub const MAX_ITERATIONS_SENTINEL: &str = "Reached max iterations without a final answer.";

/// Corrective observation for turns with neither an Action nor an Answer.
pub const FORMAT_CORRECTION: &str = "Error: You must provide an 'Action:' to use a tool, or an 'Answer:' if you are finished. Please follow the format.";

/// Observation returned when the user denies a privileged action.
pub const APPROVAL_DENIED: &str = "The user rejected this action. Do not retry it as-is. \
Consider a safer alternative, such as running the step in a sandboxed environment, \
or ask the user how to proceed.";

/// Prefix for observations fed back to the model.
pub const OBSERVATION_PREFIX: &str = "Observation: ";

/// Characters of an observation shown in the terminal before eliding.
pub const OBSERVATION_DISPLAY_CHARS: usize = 150;

// --- Logging ---

/// Log filter used when neither `RUST_LOG`, `--verbose` nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

// --- Tool limits ---

/// Default timeout for `execute_command`.
pub const COMMAND_DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum output size (bytes) returned from `execute_command`.
pub const COMMAND_MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// Environment variables removed before running shell commands.
pub const COMMAND_STRIPPED_ENV_VARS: &[&str] = &[
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "GEMINI_API_KEY",
];

/// Characters of page text `browser_get_content` returns.
pub const BROWSER_CONTENT_MAX_CHARS: usize = 2000;

/// Request timeout for browser page loads.
pub const BROWSER_TIMEOUT_SECS: u64 = 30;

/// Maximum page body the browser will accept (bytes).
pub const BROWSER_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;
