//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use vigil_config::LoadedConfig;

pub mod config;
pub mod list;
pub mod run;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Where to look for a project-local config file.
    pub project_dir: Option<PathBuf>,
}

impl Context {
    /// Load configuration from every layer.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = vigil_config::load_config(self.project_dir.as_deref())?;
        for warning in &loaded.warnings {
            tracing::warn!(%warning, "Config warning");
        }
        Ok(loaded)
    }
}
