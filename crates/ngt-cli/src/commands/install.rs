//! Install command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ngt_core::config::{self, AppConfig};
use ngt_core::daemon::{DaemonInstaller, Platform};

use crate::commands::{load_app_config, resolve_config_path};
use crate::output::{print_info, print_success};

/// Execute the install command
pub async fn install_command(config_path: Option<&PathBuf>, dir: Option<PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);
    let mut app = load_app_config(&path)?;

    install_daemon(&mut app, &path, dir).await?;
    Ok(())
}

/// Download ngrok, point the config at it and save the config
pub async fn install_daemon(
    app: &mut AppConfig,
    config_path: &Path,
    dir: Option<PathBuf>,
) -> Result<PathBuf> {
    let dir = dir.unwrap_or_else(|| config::default_config_dir().join("bin"));
    let installer = DaemonInstaller::with_client(
        reqwest::Client::new(),
        app.download_page.clone(),
        Platform::current(),
    )
    .with_install_dir(&dir);

    print_info(&format!(
        "Downloading ngrok for {}/{}...",
        installer.platform().os,
        installer.platform().arch
    ));
    let installed = installer
        .install_executable()
        .await
        .context("Failed to install ngrok")?;

    app.executable_path = installed.display().to_string();
    config::save_config(config_path, &*app)
        .with_context(|| format!("Failed to save config: {:?}", config_path))?;

    print_success(&format!("Installed ngrok to {}", installed.display()));
    Ok(installed)
}
