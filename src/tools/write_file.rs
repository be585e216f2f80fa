//! Write-file tool: saves content to a file, creating parent directories as needed.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::Tool;
use crate::diff;
use crate::error::ToolError;

/// Tool that writes string content to a file.
///
/// Relative paths resolve against the working directory; absolute paths are
/// used as given. The call is normally approval-gated, and the approval
/// prompt shows a diff of the change.
pub struct WriteFileTool {
    working_dir: PathBuf,
}

impl WriteFileTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        if Path::new(filename).is_absolute() {
            PathBuf::from(filename)
        } else {
            self.working_dir.join(filename)
        }
    }
}

#[derive(Deserialize)]
struct WriteFileInput {
    filename: Option<String>,
    content: Option<String>,
}

impl WriteFileInput {
    fn from_args(args: &Map<String, Value>) -> Option<(String, String)> {
        let input: Self = serde_json::from_value(Value::Object(args.clone())).ok()?;
        match (input.filename, input.content) {
            (Some(filename), Some(content)) if !filename.is_empty() => Some((filename, content)),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Saves content to a file, creating parent directories as needed."
    }

    fn usage(&self) -> &str {
        r#"write_file({"filename": "out.txt", "content": "hello"})"#
    }

    fn preview(&self, args: &Map<String, Value>) -> Option<String> {
        let (filename, content) = WriteFileInput::from_args(args)?;
        // Sync read: the user is already waiting at the prompt.
        let old = std::fs::read_to_string(self.resolve(&filename)).ok();
        Some(diff::write_preview(&filename, old.as_deref(), &content))
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        _cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let Some((filename, content)) = WriteFileInput::from_args(&args) else {
            return Ok("Error: write_file requires 'filename' and 'content'.".into());
        };
        let path = self.resolve(&filename);

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(format!("Error: {e}"));
            }
        }
        match tokio::fs::write(&path, content).await {
            Ok(()) => Ok(format!("Successfully wrote to {}", path.display())),
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}
