//! CLI command implementations

pub mod config;
pub mod install;
pub mod list;
pub mod start;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ngt_core::config::{self as core_config, AppConfig};
use ngt_core::ConfigError;

pub use config::{config_get, config_init, config_path, config_set, config_show};
pub use install::install_command;
pub use list::list_command;
pub use start::start_command;
pub use status::status_command;

/// The `--config` override or the default location
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(core_config::default_config_path)
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    match core_config::load_config::<AppConfig>(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound(_)) => {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(AppConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config: {:?}", path)),
    }
}
