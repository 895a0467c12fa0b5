//! Endpoint configuration for a single project
//!
//! Turns the raw URL or port setting of a project into the local address
//! the daemon should forward to.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{TunnelRequest, TUNNEL_PROTO};

const HTTPS_PREFIX: &str = "https://";

fn https_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https://[^/]+").expect("valid https pattern"))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid number pattern"))
}

/// Parse a raw project setting into a canonical local address.
///
/// An `https://host[:port]` prefix is kept verbatim so the daemon forwards
/// over TLS. Otherwise the first run of digits is taken as a port on
/// `localhost`. Returns `None` when neither applies.
pub fn parse_local_address(raw: &str) -> Option<String> {
    if let Some(m) = https_pattern().find(raw) {
        return Some(m.as_str().to_string());
    }

    number_pattern()
        .find(raw)
        .map(|m| format!("localhost:{}", m.as_str()))
}

/// Desired tunnel for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Address to forward to; `None` when the setting could not be parsed
    pub local_address: Option<String>,
    pub subdomain: Option<String>,
    pub hostname: Option<String>,
    pub region: Option<String>,
    /// Set once the daemon has created the tunnel
    pub public_url: Option<String>,
}

impl EndpointConfig {
    /// Build a config from the raw URL or port setting of a project
    pub fn from_setting(raw: &str) -> Self {
        Self {
            local_address: parse_local_address(raw),
            ..Self::default()
        }
    }

    pub fn with_subdomain(mut self, subdomain: Option<&str>) -> Self {
        self.subdomain = non_blank(subdomain);
        self
    }

    pub fn with_hostname(mut self, hostname: Option<&str>) -> Self {
        self.hostname = non_blank(hostname);
        self
    }

    pub fn with_region(mut self, region: Option<&str>) -> Self {
        self.region = non_blank(region);
        self
    }

    /// Whether the setting produced a usable address
    pub fn is_valid(&self) -> bool {
        self.local_address.is_some()
    }

    /// Host header for the tunnel: the address without any `https://` scheme
    pub fn host_header(&self) -> Option<&str> {
        self.local_address
            .as_deref()
            .map(|addr| addr.strip_prefix(HTTPS_PREFIX).unwrap_or(addr))
    }

    /// Build the creation request for this endpoint.
    ///
    /// `hostname` takes precedence over `subdomain`; only one is sent.
    /// Returns `None` for an invalid config.
    pub fn to_request(&self, project_name: &str) -> Option<TunnelRequest> {
        let addr = self.local_address.clone()?;
        let host_header = self.host_header()?.to_string();

        let (hostname, subdomain) = match (&self.hostname, &self.subdomain) {
            (Some(hostname), _) => (Some(hostname.clone()), None),
            (None, subdomain) => (None, subdomain.clone()),
        };

        Some(TunnelRequest {
            name: project_name.to_string(),
            addr,
            proto: TUNNEL_PROTO.to_string(),
            subdomain,
            hostname,
            host_header,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
