//! Status command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use ngt_core::daemon::DaemonController;
use ngt_orchestrator::ControlApiClient;

use crate::commands::{load_app_config, resolve_config_path};
use crate::output::{format_status, StatusReport};

/// Execute the status command
pub async fn status_command(config_path: Option<&PathBuf>) -> Result<()> {
    let app = load_app_config(&resolve_config_path(config_path))?;
    let controller = DaemonController::new(&app.executable_path);

    let installed = controller.is_installed();
    let version = if installed {
        controller.version().unwrap_or_else(|e| {
            tracing::debug!("Version query failed: {}", e);
            None
        })
    } else {
        None
    };

    let api = ControlApiClient::new(&app.api_url).context("Invalid control API URL")?;
    let tunnels = match api.list_tunnels().await {
        Ok(t) => Some(t.len()),
        Err(e) => {
            tracing::debug!("Control API not reachable: {}", e);
            None
        }
    };

    let report = StatusReport {
        executable: controller.resolve_executable_path().display().to_string(),
        installed,
        version,
        usable: version.map(|v| v.is_supported()).unwrap_or(false),
        api_url: app.api_url.clone(),
        tunnels,
    };

    print!("{}", format_status(&report));
    Ok(())
}
