//! ngrok-tunnels CLI
//!
//! Exposes configured local web projects through ngrok:
//! - Starting tunnels (launching ngrok when it is not running)
//! - Inspecting the daemon and its tunnels
//! - Installing ngrok and managing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ngrok_tunnels::commands;

#[derive(Parser)]
#[command(name = "ngrok-tunnels")]
#[command(author, version, about = "Expose local web projects through ngrok tunnels")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "NGROK_TUNNELS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tunnels for the configured projects
    Start {
        /// Only start these projects (repeatable)
        #[arg(short, long = "project")]
        projects: Vec<String>,
        /// Download ngrok first if it is missing or too old
        #[arg(long)]
        install: bool,
        /// Open ngrok in a visible console window
        #[arg(long)]
        show_window: bool,
    },

    /// List tunnels currently running in ngrok
    List,

    /// Show ngrok installation and daemon status
    Status,

    /// Download and install the ngrok executable
    Install {
        /// Directory to install into (default: <config dir>/bin)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show config file path
    Path,
    /// Show current configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Create a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = cli.config.as_ref();
    match cli.command {
        Commands::Start {
            projects,
            install,
            show_window,
        } => commands::start_command(config, &projects, install, show_window).await,
        Commands::List => commands::list_command(config).await,
        Commands::Status => commands::status_command(config).await,
        Commands::Install { dir } => commands::install_command(config, dir).await,
        Commands::Config { action } => match action {
            ConfigAction::Path => commands::config_path(config),
            ConfigAction::Show => commands::config_show(config),
            ConfigAction::Get { key } => commands::config_get(config, &key),
            ConfigAction::Set { key, value } => commands::config_set(config, &key, &value),
            ConfigAction::Init { force } => commands::config_init(config, force),
        },
    }
}
