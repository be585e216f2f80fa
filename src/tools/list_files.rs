use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::Tool;
use crate::error::ToolError;

pub struct ListFilesTool {
    working_dir: PathBuf,
}

impl ListFilesTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }
}

#[derive(Deserialize, Default)]
struct ListFilesInput {
    directory: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists the entries of a directory (default: the working directory)."
    }

    fn usage(&self) -> &str {
        r#"list_files({"directory": "."})"#
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        _cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let input: ListFilesInput = serde_json::from_value(Value::Object(args)).unwrap_or_default();
        let directory = input
            .directory
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| ".".into());
        let path = self.working_dir.join(&directory);

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) => return Ok(format!("Error: {}: {e}", path.display())),
        };
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().into_owned()),
                Ok(None) => break,
                Err(e) => return Ok(format!("Error: {e}")),
            }
        }
        names.sort();

        Ok(format!("Files in {}:\n{}", path.display(), names.join("\n")))
    }
}
