//! Configuration sources: defaults, global file, environment overrides.

use crate::config::CanopyConfig;
use crate::error::ClientError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Layered configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources.
    ///
    /// Priority, lowest to highest: built-in defaults, the global config
    /// file, `CANOPY_*` environment variables (e.g.
    /// `CANOPY_REPOSITORY__OWNER`).
    pub fn load() -> Result<CanopyConfig, ClientError> {
        let mut builder = Config::builder();
        builder = Self::add_global_file(builder);
        builder = builder.add_source(
            Environment::with_prefix("CANOPY")
                .prefix_separator("_")
                .separator("__"),
        );
        let settings = builder.build()?;
        settings.try_deserialize().map_err(ClientError::from)
    }

    /// Load configuration from a single file.
    pub fn load_from_file(path: &Path) -> Result<CanopyConfig, ClientError> {
        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .build()?;
        settings.try_deserialize().map_err(ClientError::from)
    }

    /// Path to the global config file.
    ///
    /// Uses `$XDG_CONFIG_HOME/canopy/config.toml` when set, otherwise
    /// `~/.config/canopy/config.toml`.
    pub fn global_config_path() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|base| base.join("canopy").join("config.toml"))
    }

    fn add_global_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        match Self::global_config_path() {
            Some(path) if path.exists() => {
                builder.add_source(File::from(path).required(false))
            }
            Some(path) => {
                warn!(
                    config_path = %path.display(),
                    "global configuration file not found; using defaults"
                );
                builder
            }
            None => builder,
        }
    }
}
