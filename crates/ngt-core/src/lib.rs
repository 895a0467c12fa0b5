//! ngt-core: Core building blocks for ngrok-tunnels
//!
//! This crate provides endpoint parsing, the control API wire types,
//! configuration, and control over the external ngrok executable
//! (locating, versioning, launching and installing it).

pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod error;
pub mod types;

pub use endpoint::{parse_local_address, EndpointConfig};
pub use error::{ConfigError, DownloadError, OrchestrationError, ProcessError};
pub use types::{ApiError, TunnelList, TunnelRecord, TunnelRequest};
