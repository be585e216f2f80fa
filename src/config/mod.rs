//! Configuration types and path resolution for embryo.
//!
//! Embryo stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/embryo/config.toml` on Linux). A per-project
//! `embryo.toml`, found by walking up to the git root, overrides it.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;
#[allow(unused_imports)]
pub use types::{ProviderConfig, ProviderEntry};

use anyhow::Result;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates the global config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project(&std::env::current_dir()?)?;

        let mut config = match project {
            Some(project) => Self::merge(global, project),
            None => global,
        };
        config.resolve_substitutions(&crate::provider::env_var);
        Ok(config)
    }
}
