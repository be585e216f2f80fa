//! File loading and merging for embryo configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{Config, ProviderConfig, ProviderEntry};
use crate::constants::{PROJECT_CONFIG_FILENAME, OLLAMA_DEFAULT_BASE_URL};

impl Config {
    /// Loads the global config from `~/.config/embryo/config.toml`.
    ///
    /// If no config file exists, creates one with `{env:VAR}` placeholders for
    /// API keys and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_config_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            debug!(path = %path.display(), "wrote default config");
            return toml::from_str(&default_toml).context("Failed to parse default config");
        }
        Self::load_file(&path)
    }

    /// Parses one config file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Finds `embryo.toml` in `start` or a parent, stopping at the git root.
    pub(super) fn find_project(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() || !dir.pop() {
                return None;
            }
        }
    }

    pub(super) fn load_project(start: &Path) -> Result<Option<Self>> {
        match Self::find_project(start) {
            Some(path) => {
                debug!(path = %path.display(), "loading project config");
                Self::load_file(&path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Merge project config over global config. Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: project.model.or(global.model),
            default_provider: project.default_provider.or(global.default_provider),
            max_iterations: project.max_iterations.or(global.max_iterations),
            command_timeout_secs: project.command_timeout_secs.or(global.command_timeout_secs),
            log_level: project.log_level.or(global.log_level),
            provider: ProviderConfig {
                anthropic: ProviderEntry::overlay(global.provider.anthropic, project.provider.anthropic),
                openai: ProviderEntry::overlay(global.provider.openai, project.provider.openai),
                openrouter: ProviderEntry::overlay(
                    global.provider.openrouter,
                    project.provider.openrouter,
                ),
                ollama: ProviderEntry::overlay(global.provider.ollama, project.provider.ollama),
                gemini: ProviderEntry::overlay(global.provider.gemini, project.provider.gemini),
            },
            permissions: global.permissions.merged_with(project.permissions),
        }
    }
}

fn default_config_toml() -> String {
    format!(
        r#"# max_iterations = 15
# command_timeout_secs = 60
# log_level = "info"

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.gemini]
api_key = "{{env:GEMINI_API_KEY}}"

[provider.ollama]
base_url = "{OLLAMA_DEFAULT_BASE_URL}"

[permissions.tools]
execute_command = "ask"
write_file = "ask"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::Permission;

    #[test]
    fn test_default_toml_parses() {
        let config: Config = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(
            config.provider.anthropic.unwrap().api_key.as_deref(),
            Some("{env:ANTHROPIC_API_KEY}")
        );
        assert_eq!(
            config.permissions.for_tool("write_file"),
            Permission::Ask
        );
        assert!(config.max_iterations.is_none());
    }

    #[test]
    fn test_find_project_walks_up_to_git_root() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join(".git")).unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(Config::find_project(&nested).is_none());

        std::fs::write(root.path().join(PROJECT_CONFIG_FILENAME), "max_iterations = 4").unwrap();
        let found = Config::find_project(&nested).unwrap();
        assert_eq!(found, root.path().join(PROJECT_CONFIG_FILENAME));

        let project = Config::load_project(&nested).unwrap().unwrap();
        assert_eq!(project.max_iterations, Some(4));
    }

    #[test]
    fn test_merge_prefers_project_and_deep_merges() {
        let global: Config = toml::from_str(
            r#"
model = "claude-x"
max_iterations = 20
[provider.anthropic]
api_key = "global-key"
model = "global-model"
[permissions.tools]
execute_command = "allow"
list_files = "ask"
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
max_iterations = 5
[provider.anthropic]
model = "project-model"
[permissions.tools]
execute_command = "deny"
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        assert_eq!(merged.model.as_deref(), Some("claude-x"));
        assert_eq!(merged.max_iterations, Some(5));
        let anthropic = merged.provider.anthropic.unwrap();
        assert_eq!(anthropic.api_key.as_deref(), Some("global-key"));
        assert_eq!(anthropic.model.as_deref(), Some("project-model"));
        assert_eq!(merged.permissions.for_tool("execute_command"), Permission::Deny);
        assert_eq!(merged.permissions.for_tool("list_files"), Permission::Ask);
    }

    #[test]
    fn test_load_file_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_iterations = \"many\"").unwrap();
        let err = Config::load_file(&path).unwrap_err();
        assert!(format!("{err}").contains("bad.toml"));
    }
}
