pub mod browser;
pub mod execute_command;
pub mod list_files;
pub mod write_file;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::parser::ActionCall;
use crate::approval::{ApprovalGate, PendingAction, Permission, PermissionConfig};
use crate::constants::APPROVAL_DENIED;
use crate::error::{AgentError, ToolError};

use browser::{
    BrowserClickTool, BrowserGetContentTool, BrowserOpenTool, BrowserSession, BrowserTypeTool,
};
use execute_command::ExecuteCommandTool;
use list_files::ListFilesTool;
use write_file::WriteFileTool;

/// Every tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// One-line description for the system prompt.
    fn description(&self) -> &str;

    /// Example call in the `name({...})` syntax the parser expects.
    fn usage(&self) -> &str;

    /// Extra context shown when the call needs approval.
    fn preview(&self, _args: &Map<String, Value>) -> Option<String> {
        None
    }

    /// Run the tool. Return `Err` only for cancellation or failures the tool
    /// cannot describe itself; the registry stringifies the latter.
    async fn invoke(
        &self,
        args: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError>;

    /// Release anything the tool holds between calls.
    async fn shutdown(&self) {}
}

/// A tool plus whether each call must pass the approval gate.
struct RegisteredTool {
    tool: Arc<dyn Tool>,
    requires_approval: bool,
}

/// Holds all registered tools and dispatches calls by name.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any earlier one with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>, requires_approval: bool) {
        debug!(tool = %tool.name(), requires_approval, "registering tool");
        self.tools.retain(|t| t.tool.name() != tool.name());
        self.tools.push(RegisteredTool {
            tool,
            requires_approval,
        });
    }

    /// Register `tool` at the level `permissions` gives it. Denied tools are
    /// left out so the model never sees them.
    pub fn register_with(&mut self, tool: Arc<dyn Tool>, permissions: &PermissionConfig) {
        match permissions.for_tool(tool.name()) {
            Permission::Allow => self.register(tool, false),
            Permission::Ask => self.register(tool, true),
            Permission::Deny => debug!(tool = %tool.name(), "tool denied by config"),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool.name()).collect()
    }

    fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.tool.name() == name)
    }

    /// Numbered tool list for the system prompt.
    pub fn prompt_listing(&self) -> String {
        self.tools
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}: {}", i + 1, t.tool.usage(), t.tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Resolve and run one action, producing the observation for the model.
    ///
    /// Unknown tools, bad arguments, denials and tool failures all come back
    /// as `Ok` observations. Only cancellation is an `Err`.
    pub async fn dispatch(
        &self,
        call: &ActionCall,
        gate: &dyn ApprovalGate,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let Some(entry) = self.get(&call.name) else {
            debug!(tool = %call.name, "unknown tool");
            return Ok(format!("Tool {} not found.", call.name));
        };

        let args = match parse_args(&call.raw_args) {
            Ok(args) => args,
            Err(e) => {
                debug!(tool = %call.name, error = %e, "argument parse failed");
                return Ok(format!(
                    "Error parsing arguments as JSON: {e}. Please use the format tool_name({{\"arg\": \"val\"}})"
                ));
            }
        };

        if entry.requires_approval {
            let pending = PendingAction::new(&call.name, &args, entry.tool.preview(&args));
            let approved = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                approved = gate.request(&pending) => approved,
            };
            if !approved {
                info!(tool = %call.name, "action rejected by user");
                return Ok(APPROVAL_DENIED.to_string());
            }
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::Cancelled),
            result = entry.tool.invoke(args, cancel) => result,
        };

        match result {
            Ok(output) => Ok(output),
            Err(ToolError::Cancelled) => {
                debug!(tool = %call.name, "tool call cancelled");
                Err(AgentError::Cancelled)
            }
            Err(ToolError::Failed(e)) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                Ok(format!("Error executing {}: {e:#}", call.name))
            }
        }
    }

    /// Let every tool release what it holds.
    pub async fn shutdown(&self) {
        for entry in &self.tools {
            entry.tool.shutdown().await;
        }
    }
}

/// Empty payloads and `{}` mean no arguments; anything else must be a JSON object.
fn parse_args(raw: &str) -> serde_json::Result<Map<String, Value>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "{}" {
        return Ok(Map::new());
    }
    serde_json::from_str(raw)
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with all built-in tools, rooted at `working_dir`.
    pub fn with_builtins(
        working_dir: PathBuf,
        permissions: &PermissionConfig,
        command_timeout: Duration,
    ) -> Self {
        let mut registry = Self::new();
        let browser = Arc::new(BrowserSession::new());
        registry.register_with(
            Arc::new(ExecuteCommandTool::new(working_dir.clone(), command_timeout)),
            permissions,
        );
        registry.register_with(Arc::new(WriteFileTool::new(working_dir.clone())), permissions);
        registry.register_with(Arc::new(ListFilesTool::new(working_dir)), permissions);
        registry.register_with(
            Arc::new(BrowserOpenTool::new(Arc::clone(&browser))),
            permissions,
        );
        registry.register_with(
            Arc::new(BrowserClickTool::new(Arc::clone(&browser))),
            permissions,
        );
        registry.register_with(
            Arc::new(BrowserTypeTool::new(Arc::clone(&browser))),
            permissions,
        );
        registry.register_with(Arc::new(BrowserGetContentTool::new(browser)), permissions);
        registry
    }
}
