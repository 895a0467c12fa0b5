//! Application settings and per-project endpoint entries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::endpoint::EndpointConfig;

/// Default address of the daemon's local control API
pub const DEFAULT_API_URL: &str = "http://localhost:4040";

/// Default vendor page listing the daemon downloads
pub const DEFAULT_DOWNLOAD_PAGE: &str = "https://ngrok.com/download";

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Full path to the daemon executable; blank means "use PATH"
    pub executable_path: String,

    /// Base URL of the daemon control API
    pub api_url: String,

    /// Vendor download page scraped by the installer
    pub download_page: String,

    /// Grace period after launching the daemon before listing tunnels again
    #[serde(rename = "startup_grace_ms", with = "duration_millis")]
    pub startup_grace: Duration,

    /// Delay before retrying a creation whose error body was unreadable
    #[serde(rename = "create_retry_delay_ms", with = "duration_millis")]
    pub create_retry_delay: Duration,

    /// Launch the daemon in a visible console window
    pub show_window: bool,

    /// Projects to expose, keyed by project name
    pub projects: BTreeMap<String, ProjectEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            executable_path: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            download_page: DEFAULT_DOWNLOAD_PAGE.to_string(),
            startup_grace: Duration::from_millis(250),
            create_retry_delay: Duration::from_millis(1000),
            show_window: false,
            projects: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Build the desired endpoint set, optionally restricted to some projects
    pub fn endpoint_configs(&self, only: &[String]) -> BTreeMap<String, EndpointConfig> {
        self.projects
            .iter()
            .filter(|(name, _)| only.is_empty() || only.iter().any(|o| o == *name))
            .map(|(name, entry)| (name.clone(), entry.to_endpoint()))
            .collect()
    }
}

/// One project's tunnel settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    /// Application URL or bare port number
    pub url: String,
    pub subdomain: Option<String>,
    pub hostname: Option<String>,
    pub region: Option<String>,
}

impl ProjectEntry {
    pub fn to_endpoint(&self) -> EndpointConfig {
        EndpointConfig::from_setting(&self.url)
            .with_subdomain(self.subdomain.as_deref())
            .with_hostname(self.hostname.as_deref())
            .with_region(self.region.as_deref())
    }
}
