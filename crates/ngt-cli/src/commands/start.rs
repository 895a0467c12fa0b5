//! Start command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use ngt_core::daemon::{DaemonController, MIN_SUPPORTED_VERSION};
use ngt_orchestrator::{ControlApiClient, OrchestratorSettings, TunnelOrchestrator};

use crate::commands::install::install_daemon;
use crate::commands::{load_app_config, resolve_config_path};
use crate::output::{print_info, print_success, print_warning, TerminalReporter};

/// Execute the start command
pub async fn start_command(
    config_path: Option<&PathBuf>,
    projects: &[String],
    install: bool,
    show_window: bool,
) -> Result<()> {
    let path = resolve_config_path(config_path);
    let mut app = load_app_config(&path)?;

    for name in projects {
        if !app.projects.contains_key(name) {
            print_warning(&format!("Unknown project: {}", name));
        }
    }

    let mut controller = DaemonController::new(&app.executable_path);
    if !controller.is_usable() {
        if install {
            install_daemon(&mut app, &path, None).await?;
            controller = DaemonController::new(&app.executable_path);
        } else {
            print_warning(&format!(
                "ngrok {} or later was not found. Run 'ngrok-tunnels install' or pass --install",
                MIN_SUPPORTED_VERSION
            ));
        }
    }

    let api = ControlApiClient::new(&app.api_url).context("Invalid control API URL")?;
    let mut settings = OrchestratorSettings::from(&app);
    settings.show_window |= show_window;

    let mut orchestrator =
        TunnelOrchestrator::new(api, controller, Arc::new(TerminalReporter), settings);

    let mut configs = app.endpoint_configs(projects);
    let summary = orchestrator.start_tunnels(&mut configs).await;

    for (name, config) in &configs {
        let Some(url) = config.public_url.as_deref() else {
            continue;
        };
        if summary.created.contains(name) {
            print_success(&format!("{}: {}", name, url));
        } else {
            print_info(&format!("{}: {} (already running)", name, url));
        }
    }
    for name in &summary.invalid {
        print_warning(&format!("{}: no usable local address in its url setting", name));
    }

    if let Some(mut daemon) = orchestrator.take_daemon() {
        if summary.aborted {
            daemon.stop().context("Failed to stop ngrok")?;
            anyhow::bail!("ngrok did not come up");
        }

        print_info(&format!(
            "ngrok running (PID: {}). Press Ctrl+C to stop.",
            daemon.pid()
        ));
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        daemon.stop().context("Failed to stop ngrok")?;
        print_info("ngrok stopped");
    }

    if summary.is_clean() {
        Ok(())
    } else {
        anyhow::bail!("Some tunnels could not be started")
    }
}
