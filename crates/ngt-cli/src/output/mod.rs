//! Output formatting utilities for the CLI
//!
//! Tables for tunnels, the status display, and coloured status messages.

use std::io::Write;

use async_trait::async_trait;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use ngt_core::daemon::DaemonVersion;
use ngt_core::TunnelRecord;
use ngt_orchestrator::ErrorReporter;

/// Format the daemon's tunnels as an ASCII table
///
/// Returns "No tunnels running" if the list is empty.
pub fn format_tunnels(tunnels: &[TunnelRecord]) -> String {
    if tunnels.is_empty() {
        return "No tunnels running".to_string();
    }

    #[derive(Tabled)]
    struct TunnelRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "PUBLIC URL")]
        public_url: String,
        #[tabled(rename = "PROTO")]
        proto: String,
        #[tabled(rename = "ADDRESS")]
        addr: String,
    }

    let rows: Vec<TunnelRow> = tunnels
        .iter()
        .map(|t| TunnelRow {
            name: t.name.clone(),
            public_url: dash_if_empty(&t.public_url),
            proto: dash_if_empty(&t.proto),
            addr: dash_if_empty(&t.config.addr),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Everything the `status` command reports
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub executable: String,
    pub installed: bool,
    pub version: Option<DaemonVersion>,
    pub usable: bool,
    pub api_url: String,
    /// Number of running tunnels, `None` when the API did not answer
    pub tunnels: Option<usize>,
}

/// Format the status report as a human-readable string
pub fn format_status(status: &StatusReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Executable: {}\n", status.executable));
    output.push_str(&format!("Installed: {}\n", yes_no(status.installed)));
    output.push_str(&format!(
        "Version: {}\n",
        status
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    ));
    output.push_str(&format!("Usable: {}\n", yes_no(status.usable)));
    output.push_str(&format!("Control API: {}\n", status.api_url));
    match status.tunnels {
        Some(count) => output.push_str(&format!("Daemon: running ({} tunnel(s))\n", count)),
        None => output.push_str("Daemon: not reachable\n"),
    }

    output
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn dash_if_empty(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Reporter that prints orchestration errors to the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReporter;

#[async_trait]
impl ErrorReporter for TerminalReporter {
    async fn report_error(&self, message: String) {
        print_error(&message);
    }
}

fn print_tagged(mut out: impl Write, color: Color, tag: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(tag),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message in green to stdout
pub fn print_success(msg: &str) {
    print_tagged(std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Print an error message in red to stderr
pub fn print_error(msg: &str) {
    print_tagged(std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    print_tagged(std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan to stdout
pub fn print_info(msg: &str) {
    print_tagged(std::io::stdout(), Color::Cyan, "ℹ ", msg);
}
