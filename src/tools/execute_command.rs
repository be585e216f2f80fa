//! Shell command execution on the host.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Tool;
use crate::constants::{COMMAND_MAX_OUTPUT_SIZE, COMMAND_STRIPPED_ENV_VARS};
use crate::error::ToolError;

/// Runs `sh -c <command>` in the working directory.
///
/// Commands get a timeout, an output size cap, and an environment without
/// provider API keys. The child is killed if the call is cancelled.
pub struct ExecuteCommandTool {
    working_dir: PathBuf,
    timeout: Duration,
}

impl ExecuteCommandTool {
    pub fn new(working_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            working_dir,
            timeout,
        }
    }
}

#[derive(Deserialize)]
struct ExecuteCommandInput {
    command: Option<String>,
}

/// Truncate `output` to at most `COMMAND_MAX_OUTPUT_SIZE` bytes on a char boundary.
fn cap_output(output: &str) -> String {
    if output.len() <= COMMAND_MAX_OUTPUT_SIZE {
        return output.to_string();
    }
    let mut end = COMMAND_MAX_OUTPUT_SIZE;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... output truncated at {} bytes",
        &output[..end],
        COMMAND_MAX_OUTPUT_SIZE
    )
}

#[async_trait::async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Runs a shell command. Use this for any system-level task."
    }

    fn usage(&self) -> &str {
        r#"execute_command({"command": "ls"})"#
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let input: ExecuteCommandInput = serde_json::from_value(Value::Object(args))
            .context("invalid arguments for execute_command")?;
        let Some(command) = input.command.filter(|c| !c.trim().is_empty()) else {
            return Ok("Error: No command provided.".into());
        };
        debug!(%command, "running shell command");

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in COMMAND_STRIPPED_ENV_VARS {
            cmd.env_remove(var);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Ok(format!("Error: failed to start command: {e}")),
        };

        // Dropping the wait future on cancel drops the child, which kills it.
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => result,
        };

        match output {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let text = cap_output(text.trim());

                if !output.status.success() {
                    let code = output.status.code().unwrap_or(-1);
                    return Ok(format!("Error: command exited with status {code}\n{text}"));
                }
                let text = if text.is_empty() {
                    "Success (no output)".to_string()
                } else {
                    text
                };
                Ok(format!("[CWD: {}]\n{}", self.working_dir.display(), text))
            }
            Ok(Err(e)) => Ok(format!("Error: {e}")),
            Err(_) => Ok(format!(
                "Error: command timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }
}
