//! Configuration management for ngrok-tunnels

mod settings;
pub mod serde_utils;

pub use settings::{AppConfig, ProjectEntry, DEFAULT_API_URL, DEFAULT_DOWNLOAD_PAGE};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ngrok-tunnels";
const CONFIG_FILE: &str = "config.toml";

/// Per-user directory holding the config file and an installed daemon
pub fn default_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => PathBuf::from(".").join(APP_DIR),
    }
}

/// `<config dir>/config.toml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE)
}

/// Read and deserialize a TOML config file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(ConfigError::Invalid(format!("Cannot read {:?}: {}", path, e))),
    };

    Ok(toml::from_str(&content)?)
}

/// Serialize `config` to TOML and replace the file at `path`.
///
/// The content goes to a sibling temp file first and is renamed over the
/// target, so readers never see a half-written config.
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| ConfigError::Invalid(format!("Cannot create {:?}: {}", dir, e)))?;
    }

    let staging = staging_path(path);
    std::fs::write(&staging, content)
        .and_then(|_| std::fs::rename(&staging, path))
        .map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            ConfigError::Invalid(format!("Cannot write {:?}: {}", path, e))
        })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}
