//! List command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use ngt_orchestrator::ControlApiClient;

use crate::commands::{load_app_config, resolve_config_path};
use crate::output::{format_tunnels, print_error, print_info};

/// Execute the list command
pub async fn list_command(config_path: Option<&PathBuf>) -> Result<()> {
    let app = load_app_config(&resolve_config_path(config_path))?;
    let api = ControlApiClient::new(&app.api_url).context("Invalid control API URL")?;

    let tunnels = match api.list_tunnels().await {
        Ok(t) => t,
        Err(e) => {
            print_error(&format!("Could not reach ngrok at {}: {}", app.api_url, e));
            print_info("Is ngrok running? Try: ngrok-tunnels start");
            return Err(e.into());
        }
    };

    println!("{}", format_tunnels(&tunnels));
    Ok(())
}
