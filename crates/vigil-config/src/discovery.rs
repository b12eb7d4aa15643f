//! Config file discovery, layered merging and environment overrides.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/vigil/config.toml` (user config, or `VIGIL_CONFIG_DIR`)
//! 2. `./vigil.toml` (project-local)
//! 3. `VIGIL_*` environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::{ConfigError, Result, VigilConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "vigil.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "vigil";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "VIGIL_CONFIG_DIR";

/// Environment variables that override individual settings.
pub const ENV_OVERRIDES: &[&str] = &[
    "VIGIL_ENDPOINT",
    "VIGIL_NAMESPACE",
    "VIGIL_IDENTITY",
    "VIGIL_CLIENT_CERT",
    "VIGIL_CLIENT_KEY",
    "VIGIL_CONCURRENCY",
    "VIGIL_FEATURE_TIMEOUT_SECS",
];

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: VigilConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<String>,
    /// Problems that did not stop loading.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from every layer, reading overrides from the process
/// environment.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None, |key| std::env::var(key).ok())
}

/// Load configuration with explicit control over the user config directory
/// and the environment lookup.
///
/// `config_dir` overrides both `VIGIL_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig> {
    let mut config = VigilConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    let env_overrides = apply_env_overrides(&mut config, env)?;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<VigilConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    VigilConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &VigilConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// The user config file path.
///
/// Checks `VIGIL_CONFIG_DIR` first, then the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Apply `VIGIL_*` overrides; returns the variables that were set.
pub fn apply_env_overrides(
    config: &mut VigilConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Vec<String>> {
    let mut applied = Vec::new();
    let mut client = config.client();
    let mut harness = config.harness();
    let mut client_changed = false;
    let mut harness_changed = false;

    for key in ENV_OVERRIDES {
        let Some(value) = env(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        match *key {
            "VIGIL_ENDPOINT" => client.endpoint = value,
            "VIGIL_NAMESPACE" => client.namespace = value,
            "VIGIL_IDENTITY" => client.identity = value,
            "VIGIL_CLIENT_CERT" => client.client_cert_path = Some(PathBuf::from(value)),
            "VIGIL_CLIENT_KEY" => client.client_key_path = Some(PathBuf::from(value)),
            "VIGIL_CONCURRENCY" => harness.concurrency = parse_env(key, &value)?,
            "VIGIL_FEATURE_TIMEOUT_SECS" => harness.feature_timeout_secs = parse_env(key, &value)?,
            _ => continue,
        }
        if matches!(*key, "VIGIL_CONCURRENCY" | "VIGIL_FEATURE_TIMEOUT_SECS") {
            harness_changed = true;
        } else {
            client_changed = true;
        }
        debug!(key, "Config overridden from environment");
        applied.push(key.to_string());
    }

    if client_changed {
        config.client = Some(client);
    }
    if harness_changed {
        config.harness = Some(harness);
    }
    Ok(applied)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Try to load a config file and merge it into the existing config.
///
/// Unreadable or invalid files become warnings.
fn load_layer(config: &mut VigilConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }
    match load_config_file(path) {
        Ok(layer) => {
            debug!(path = %path.display(), "Config layer loaded");
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "[client]\nnamespace = \"conformance\"\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.client().namespace, "conformance");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/vigil.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_no_files() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env)
            .unwrap();
        assert_eq!(loaded.config, VigilConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_load_config_layered_merge() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        std::fs::write(
            user.path().join("config.toml"),
            "[client]\nendpoint = \"engine:7233\"\n[harness]\nconcurrency = 8\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join("vigil.toml"),
            "[harness]\nconcurrency = 2\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env)
            .unwrap();
        assert_eq!(loaded.config.client().endpoint, "engine:7233");
        assert_eq!(loaded.config.harness().concurrency, 2);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_invalid_layer_is_a_warning() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        std::fs::write(project.path().join("vigil.toml"), "[client\nbroken").unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env)
            .unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = [
            ("VIGIL_ENDPOINT", "remote:7233"),
            ("VIGIL_CONCURRENCY", "16"),
        ]
        .into_iter()
        .collect();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(loaded.config.client().endpoint, "remote:7233");
        assert_eq!(loaded.config.harness().concurrency, 16);
        assert_eq!(loaded.env_overrides, vec!["VIGIL_ENDPOINT", "VIGIL_CONCURRENCY"]);
    }

    #[test]
    fn test_env_override_parse_error() {
        let mut config = VigilConfig::new();
        let err = apply_env_overrides(&mut config, |key| {
            (key == "VIGIL_CONCURRENCY").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "VIGIL_CONCURRENCY"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vigil.toml");
        let mut config = VigilConfig::new();
        config.engine = Some(crate::EngineSection {
            updates_enabled: false,
            ..Default::default()
        });
        save_config(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
