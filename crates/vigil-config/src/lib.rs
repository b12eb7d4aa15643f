//! Configuration system for the Vigil conformance harness.
//!
//! TOML configuration with:
//! - `[client]` engine endpoint, namespace, identity and mTLS credentials
//! - `[harness]` batch concurrency, timeouts and the replay check
//! - `[engine]` settings for the in-process engine
//!
//! Files are layered (user config dir, then project-local `vigil.toml`),
//! then `VIGIL_*` environment variables override individual values.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, ENV_OVERRIDES, LoadedConfig, apply_env_overrides, load_config,
    load_config_file, load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{ClientSection, EngineSection, HarnessSection, VigilConfig};
