//! ngrok-tunnels CLI
//!
//! Provides the `ngrok-tunnels` command for exposing configured local
//! projects through ngrok, inspecting the daemon, and managing the
//! configuration file.

pub mod commands;
pub mod output;
