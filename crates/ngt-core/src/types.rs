//! Control API wire types
//!
//! Shapes of the JSON exchanged with the daemon's local control API
//! (`/api/tunnels`). Only the fields the orchestrator reads are typed
//! strictly; everything else tolerates absence.

use serde::{Deserialize, Serialize};

/// Protocol requested for every tunnel the orchestrator creates
pub const TUNNEL_PROTO: &str = "http";

/// Response body of `GET /api/tunnels`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelList {
    #[serde(default)]
    pub tunnels: Vec<TunnelRecord>,
    #[serde(default)]
    pub uri: String,
}

/// A tunnel as reported by the daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(default)]
    pub proto: String,
    #[serde(default)]
    pub config: TunnelConfig,
    /// Connection and HTTP metrics, kept opaque
    #[serde(default)]
    pub metrics: serde_json::Value,
}

/// Local side of a tunnel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfig {
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub inspect: bool,
}

/// Body of `POST /api/tunnels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelRequest {
    pub name: String,
    pub addr: String,
    pub proto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub host_header: String,
}

/// Error body returned by the daemon on a rejected request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error_code: i64,
    #[serde(default)]
    pub status_code: i64,
    pub msg: String,
    #[serde(default)]
    pub details: Option<ApiErrorDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetails {
    #[serde(default)]
    pub err: Option<String>,
}

impl ApiError {
    /// Detail text with literal `\n` sequences turned into newlines.
    ///
    /// `None` when the daemon omitted the nested detail object or its
    /// `err` field.
    pub fn detail(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.err.as_deref())
            .map(|err| err.replace("\\n", "\n"))
    }
}
