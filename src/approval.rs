//! Approval gate for privileged tool calls.
//!
//! Permission levels come from config and decide, per tool, whether a call
//! runs freely, needs a human "yes" first, or is not offered at all.
//! [`TerminalApprovalGate`] asks on stderr and remembers "always" answers for
//! the rest of the process.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::output::Spinner;

/// Permission level for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Ask,
    Deny,
}

/// Per-tool permission overrides from config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// tool_name -> Permission
    #[serde(default)]
    pub tools: HashMap<String, Permission>,
}

impl PermissionConfig {
    /// Configured level for `tool_name`, falling back to the built-in default.
    pub fn for_tool(&self, tool_name: &str) -> Permission {
        self.tools
            .get(tool_name)
            .copied()
            .unwrap_or_else(|| default_permission(tool_name))
    }

    /// Overlay `other` on top of `self`; `other` wins per tool.
    pub fn merged_with(mut self, other: PermissionConfig) -> Self {
        self.tools.extend(other.tools);
        self
    }
}

/// Commands and file writes touch the host, so they ask by default.
fn default_permission(tool_name: &str) -> Permission {
    match tool_name {
        "execute_command" | "write_file" => Permission::Ask,
        _ => Permission::Allow,
    }
}

/// A tool call waiting for a decision.
///
/// The registry builds this from the exact argument map it will pass to the
/// tool, so what the user approves is what runs.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub tool_name: String,
    pub args: Map<String, Value>,
    /// Extra context from the tool, e.g. a diff for file writes.
    pub preview: Option<String>,
}

impl PendingAction {
    pub fn new(tool_name: &str, args: &Map<String, Value>, preview: Option<String>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            args: args.clone(),
            preview,
        }
    }

    /// Human-readable rendering shown at the prompt. The argument map is
    /// never shortened.
    pub fn description(&self) -> String {
        let args = serde_json::to_string(&self.args).unwrap_or_default();
        let mut text = format!("{}({})", self.tool_name, args);
        if let Some(ref preview) = self.preview {
            text.push_str("\n\n");
            text.push_str(preview);
        }
        text
    }
}

/// Human-in-the-loop checkpoint for privileged actions.
///
/// The loop awaits the decision before doing anything else. `false` must never
/// lead to the tool running.
#[async_trait::async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request(&self, action: &PendingAction) -> bool;
}

/// User's answer at the terminal prompt.
#[derive(Debug, PartialEq)]
pub enum PromptResponse {
    Yes,
    No,
    Always,
}

impl PromptResponse {
    /// Anything unrecognised counts as a no.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Self::Yes,
            "a" | "always" => Self::Always,
            _ => Self::No,
        }
    }
}

/// Prompts on stderr and reads the answer from stdin.
///
/// The read runs on the blocking pool so the runtime keeps serving Ctrl+C
/// and the cancellation race in dispatch. The spinner, when set, is hidden
/// while the question is on screen.
#[derive(Clone, Default)]
pub struct TerminalApprovalGate {
    /// Tools the user answered "always" for. Shared across tasks.
    always_allowed: Arc<Mutex<HashSet<String>>>,
    spinner: Option<Spinner>,
}

impl TerminalApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same remembered answers, but pausing `spinner` while prompting.
    pub fn with_spinner(&self, spinner: Spinner) -> Self {
        Self {
            always_allowed: Arc::clone(&self.always_allowed),
            spinner: Some(spinner),
        }
    }

    fn is_always_allowed(&self, tool_name: &str) -> bool {
        self.always_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(tool_name)
    }

    fn remember(&self, tool_name: &str) {
        self.always_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tool_name.to_string());
    }

    fn prompt_user(description: &str) -> io::Result<PromptResponse> {
        eprint!(
            "\n{}\n{}\n\n{} ",
            "Embryo wants to run:".yellow().bold(),
            description,
            "Allow? [y]es / [n]o / [a]lways:".bold()
        );
        io::stderr().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;
        Ok(PromptResponse::parse(&response))
    }
}

#[async_trait::async_trait]
impl ApprovalGate for TerminalApprovalGate {
    async fn request(&self, action: &PendingAction) -> bool {
        if self.is_always_allowed(&action.tool_name) {
            debug!(tool = %action.tool_name, "approved by session override");
            return true;
        }

        let description = action.description();
        if let Some(ref spinner) = self.spinner {
            spinner.hide();
        }
        let answer = tokio::task::spawn_blocking(move || Self::prompt_user(&description))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));
        if let Some(ref spinner) = self.spinner {
            spinner.show();
        }

        match answer {
            Ok(PromptResponse::Yes) => true,
            Ok(PromptResponse::Always) => {
                self.remember(&action.tool_name);
                true
            }
            Ok(PromptResponse::No) => false,
            Err(e) => {
                warn!(error = %e, "failed to read approval answer; denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_permissions() {
        let config = PermissionConfig::default();
        assert_eq!(config.for_tool("execute_command"), Permission::Ask);
        assert_eq!(config.for_tool("write_file"), Permission::Ask);
        assert_eq!(config.for_tool("list_files"), Permission::Allow);
    }

    #[test]
    fn test_config_overrides_default() {
        let config: PermissionConfig = toml::from_str(
            r#"
            [tools]
            execute_command = "allow"
            browser_open = "deny"
            "#,
        )
        .unwrap();
        assert_eq!(config.for_tool("execute_command"), Permission::Allow);
        assert_eq!(config.for_tool("browser_open"), Permission::Deny);
        assert_eq!(config.for_tool("write_file"), Permission::Ask);
    }

    #[test]
    fn test_merged_with_prefers_overlay() {
        let mut global = PermissionConfig::default();
        global.tools.insert("list_files".into(), Permission::Deny);
        global.tools.insert("write_file".into(), Permission::Allow);
        let mut project = PermissionConfig::default();
        project.tools.insert("list_files".into(), Permission::Ask);

        let merged = global.merged_with(project);
        assert_eq!(merged.for_tool("list_files"), Permission::Ask);
        assert_eq!(merged.for_tool("write_file"), Permission::Allow);
    }

    #[test]
    fn test_prompt_response_parse() {
        assert_eq!(PromptResponse::parse("y\n"), PromptResponse::Yes);
        assert_eq!(PromptResponse::parse(" YES "), PromptResponse::Yes);
        assert_eq!(PromptResponse::parse("always"), PromptResponse::Always);
        assert_eq!(PromptResponse::parse("n"), PromptResponse::No);
        assert_eq!(PromptResponse::parse(""), PromptResponse::No);
    }

    #[test]
    fn test_description_includes_args_and_preview() {
        let args = json!({"command": "rm -rf build"});
        let action = PendingAction::new(
            "execute_command",
            args.as_object().unwrap(),
            Some("preview".into()),
        );
        let text = action.description();
        assert!(text.starts_with("execute_command({\"command\":\"rm -rf build\"})"));
        assert!(text.ends_with("preview"));
    }

    #[test]
    fn test_description_shows_long_args_in_full() {
        let command = format!("echo {} && rm -rf ~/important", "a".repeat(420));
        let args = json!({ "command": command });
        let action = PendingAction::new("execute_command", args.as_object().unwrap(), None);

        let text = action.description();
        assert!(text.contains("rm -rf ~/important"));
        assert_eq!(
            text,
            format!("execute_command({})", serde_json::to_string(&args).unwrap())
        );
    }

    #[tokio::test]
    async fn test_always_override_skips_prompt() {
        let gate = TerminalApprovalGate::new();
        gate.remember("execute_command");
        let action = PendingAction::new("execute_command", &Map::new(), None);
        assert!(gate.request(&action).await);
        // Shared with spinner-bound copies.
        let copy = TerminalApprovalGate {
            always_allowed: Arc::clone(&gate.always_allowed),
            spinner: None,
        };
        assert!(copy.is_always_allowed("execute_command"));
    }
}
