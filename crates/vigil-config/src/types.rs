//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [client]     # where the engine lives and who we are
//! [harness]    # how the feature batch is run
//! [engine]     # the in-process engine the CLI starts
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_types::ConnectionMaterial;

use crate::{ConfigError, Result};

/// Root configuration structure.
///
/// All sections are optional so partial project-local files can be layered
/// over the user config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Engine connection settings.
    pub client: Option<ClientSection>,

    /// Batch execution settings.
    pub harness: Option<HarnessSection>,

    /// In-process engine settings.
    pub engine: Option<EngineSection>,
}

impl VigilConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: VigilConfig) {
        if other.client.is_some() {
            self.client = other.client;
        }
        if other.harness.is_some() {
            self.harness = other.harness;
        }
        if other.engine.is_some() {
            self.engine = other.engine;
        }
    }

    /// Effective client section.
    pub fn client(&self) -> ClientSection {
        self.client.clone().unwrap_or_default()
    }

    /// Effective harness section.
    pub fn harness(&self) -> HarnessSection {
        self.harness.clone().unwrap_or_default()
    }

    /// Effective engine section.
    pub fn engine(&self) -> EngineSection {
        self.engine.clone().unwrap_or_default()
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        let harness = self.harness();
        if harness.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "harness.concurrency".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if harness.task_queue_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "harness.task_queue_prefix".into(),
                value: String::new(),
                reason: "must not be empty".into(),
            });
        }
        let client = self.client();
        if client.client_cert_path.is_some() != client.client_key_path.is_some() {
            return Err(ConfigError::InvalidValue {
                key: "client.client_cert_path".into(),
                value: format!("{:?}", client.client_cert_path),
                reason: "certificate and key must be set together".into(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Engine connection settings (`[client]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Engine endpoint, `host:port`.
    pub endpoint: String,
    /// Namespace features run in.
    pub namespace: String,
    /// Identity reported by the harness client.
    pub identity: String,
    /// PEM client certificate for mutual TLS.
    pub client_cert_path: Option<PathBuf>,
    /// PEM client key for mutual TLS.
    pub client_key_path: Option<PathBuf>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            endpoint: "localhost:7233".to_string(),
            namespace: "default".to_string(),
            identity: "vigil".to_string(),
            client_cert_path: None,
            client_key_path: None,
        }
    }
}

impl ClientSection {
    /// Connection material for activities that dial the engine themselves.
    pub fn connection_material(&self) -> ConnectionMaterial {
        ConnectionMaterial {
            endpoint: self.endpoint.clone(),
            namespace: self.namespace.clone(),
            identity: self.identity.clone(),
            client_cert_path: self.client_cert_path.clone(),
            client_key_path: self.client_key_path.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

/// Batch execution settings (`[harness]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSection {
    /// Prefix for per-feature task queues.
    pub task_queue_prefix: String,
    /// Features run at the same time.
    pub concurrency: usize,
    /// Wall-clock limit for one feature, execution plus checks.
    pub feature_timeout_secs: u64,
    /// Workflow execution timeout applied when a feature sets none.
    pub execution_timeout_secs: u64,
    /// Replay each passing run's history to check determinism.
    pub replay_check: bool,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            task_queue_prefix: "vigil".to_string(),
            concurrency: 4,
            feature_timeout_secs: 120,
            execution_timeout_secs: 60,
            replay_check: true,
        }
    }
}

impl HarnessSection {
    /// Per-feature limit as a duration.
    pub fn feature_timeout(&self) -> Duration {
        Duration::from_secs(self.feature_timeout_secs)
    }

    /// Default execution timeout as a duration.
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// In-process engine settings (`[engine]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Advertise and accept workflow updates.
    pub updates_enabled: bool,
    /// Rounds a workflow task may keep making progress.
    pub workflow_task_poll_limit: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            updates_enabled: true,
            workflow_task_poll_limit: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = VigilConfig::from_toml("").unwrap();
        assert_eq!(config, VigilConfig::default());
        assert_eq!(config.client().endpoint, "localhost:7233");
        assert_eq!(config.harness().concurrency, 4);
        assert_eq!(config.harness().execution_timeout(), Duration::from_secs(60));
        assert!(config.engine().updates_enabled);
    }

    #[test]
    fn test_partial_section() {
        let config = VigilConfig::from_toml(
            r#"
            [client]
            namespace = "conformance"

            [engine]
            updates_enabled = false
            "#,
        )
        .unwrap();
        let client = config.client();
        assert_eq!(client.namespace, "conformance");
        assert_eq!(client.endpoint, "localhost:7233");
        assert!(!config.engine().updates_enabled);
        assert!(config.harness.is_none());
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = VigilConfig::from_toml(
            r#"
            [client]
            endpoint = "engine:7233"
            [harness]
            concurrency = 8
            "#,
        )
        .unwrap();
        let overlay = VigilConfig::from_toml(
            r#"
            [harness]
            concurrency = 2
            "#,
        )
        .unwrap();
        base.merge(overlay);
        assert_eq!(base.client().endpoint, "engine:7233");
        assert_eq!(base.harness().concurrency, 2);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = VigilConfig::new();
        config.harness = Some(HarnessSection {
            replay_check: false,
            ..Default::default()
        });
        let text = config.to_toml().unwrap();
        assert!(text.contains("[harness]"));
        assert_eq!(VigilConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_concurrency() {
        let config = VigilConfig::from_toml("[harness]\nconcurrency = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("harness.concurrency"));
    }

    #[test]
    fn test_validate_lone_certificate() {
        let config =
            VigilConfig::from_toml("[client]\nclient_cert_path = \"/tmp/cert.pem\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_material() {
        let material = ClientSection::default().connection_material();
        assert_eq!(material.endpoint, "localhost:7233");
        assert_eq!(material.namespace, "default");
        assert!(!material.has_credentials());
    }
}
