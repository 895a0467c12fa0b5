//! Tunnel orchestration
//!
//! A pass makes sure the daemon answers on its control API (launching it
//! once if needed), then creates every configured tunnel whose local address
//! is not already forwarded. All failures are handed to the
//! [`ErrorReporter`]; a pass never returns an error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ngt_core::config::AppConfig;
use ngt_core::daemon::{DaemonController, DaemonHandle, StartOptions};
use ngt_core::types::{ApiError, TunnelRecord, TunnelRequest};
use ngt_core::{EndpointConfig, OrchestrationError};

use crate::api::{ControlApiClient, ControlApiError, CreateResponse};
use crate::report::ErrorReporter;

/// Wait after launching the daemon before asking it for tunnels again
pub const STARTUP_GRACE: Duration = Duration::from_millis(250);

/// Wait before repeating a creation request whose error was unreadable
pub const CREATE_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Reported when a pass is asked to run with no projects at all
pub const NO_PROJECTS_MESSAGE: &str = "Did not find any web projects.";

/// Timing and launch settings for a [`TunnelOrchestrator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub startup_grace: Duration,
    pub create_retry_delay: Duration,
    pub show_window: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            startup_grace: STARTUP_GRACE,
            create_retry_delay: CREATE_RETRY_DELAY,
            show_window: false,
        }
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            startup_grace: config.startup_grace,
            create_retry_delay: config.create_retry_delay,
            show_window: config.show_window,
        }
    }
}

/// What a pass did with each project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Tunnels created during this pass
    pub created: Vec<String>,
    /// Projects whose address was already forwarded
    pub existing: Vec<String>,
    /// Projects whose URL setting could not be parsed
    pub invalid: Vec<String>,
    /// Projects whose creation was rejected or failed
    pub failed: Vec<String>,
    /// The pass stopped before reconciling (daemon unavailable)
    pub aborted: bool,
}

impl PassSummary {
    /// Nothing failed and the pass ran to completion
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.failed.is_empty()
    }
}

/// Drives the daemon to the desired set of tunnels
pub struct TunnelOrchestrator {
    api: ControlApiClient,
    controller: DaemonController,
    reporter: Arc<dyn ErrorReporter>,
    settings: OrchestratorSettings,
    daemon: Option<DaemonHandle>,
}

impl std::fmt::Debug for TunnelOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelOrchestrator")
            .field("api", &self.api.base_url().as_str())
            .field("controller", &self.controller)
            .field("settings", &self.settings)
            .field("daemon", &self.daemon.as_ref().map(|d| d.pid()))
            .finish()
    }
}

impl TunnelOrchestrator {
    pub fn new(
        api: ControlApiClient,
        controller: DaemonController,
        reporter: Arc<dyn ErrorReporter>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            api,
            controller,
            reporter,
            settings,
            daemon: None,
        }
    }

    /// Daemon launched by this orchestrator, if any
    pub fn daemon(&self) -> Option<&DaemonHandle> {
        self.daemon.as_ref()
    }

    /// Give up ownership of the launched daemon
    pub fn take_daemon(&mut self) -> Option<DaemonHandle> {
        self.daemon.take()
    }

    /// Run one pass over `configs`, keyed by project name.
    ///
    /// Created tunnels get their public URL written back into the map.
    pub async fn start_tunnels(
        &mut self,
        configs: &mut BTreeMap<String, EndpointConfig>,
    ) -> PassSummary {
        if configs.is_empty() {
            self.reporter
                .report_error(NO_PROJECTS_MESSAGE.to_string())
                .await;
            return PassSummary::default();
        }

        let mut summary = PassSummary::default();
        let region = first_region(configs);

        let existing = match self.ensure_daemon(region).await {
            Ok(tunnels) => tunnels,
            Err(e) => {
                self.reporter.report_error(e.to_string()).await;
                summary.aborted = true;
                return summary;
            }
        };

        for (name, config) in configs.iter_mut() {
            let Some(request) = config.to_request(name) else {
                tracing::warn!("Skipping {}: no usable local address", name);
                summary.invalid.push(name.clone());
                continue;
            };

            if let Some(record) = existing.iter().find(|t| t.config.addr == request.addr) {
                tracing::debug!("Tunnel for {} ({}) already exists", name, request.addr);
                config.public_url = non_empty(&record.public_url);
                summary.existing.push(name.clone());
                continue;
            }

            match self.create_tunnel(&request).await {
                Ok(record) => {
                    tracing::info!("Created tunnel {} -> {}", record.public_url, request.addr);
                    config.public_url = non_empty(&record.public_url);
                    summary.created.push(name.clone());
                }
                Err(e) => {
                    self.reporter.report_error(e.to_string()).await;
                    summary.failed.push(name.clone());
                }
            }
        }

        summary
    }

    /// Current tunnels, launching the daemon once if the first query fails
    async fn ensure_daemon(
        &mut self,
        region: Option<String>,
    ) -> Result<Vec<TunnelRecord>, OrchestrationError> {
        match self.api.list_tunnels().await {
            Ok(tunnels) => return Ok(tunnels),
            Err(e) => tracing::debug!("ngrok control API not reachable: {}", e),
        }

        let running = self
            .daemon
            .as_mut()
            .map(|handle| handle.is_running())
            .unwrap_or(false);

        if running {
            tracing::debug!("ngrok already launched, waiting for its control API");
        } else {
            let options = StartOptions {
                region,
                show_window: self.settings.show_window,
            };
            self.daemon = Some(self.controller.start(&options)?);
        }

        tokio::time::sleep(self.settings.startup_grace).await;

        self.api
            .list_tunnels()
            .await
            .map_err(|e| OrchestrationError::DaemonUnreachable(e.to_string()))
    }

    /// POST the request, repeating it once when the rejection is unreadable
    async fn create_tunnel(&self, request: &TunnelRequest) -> Result<TunnelRecord, OrchestrationError> {
        let mut retried = false;

        loop {
            let body = match self.api.create_tunnel(request).await {
                Ok(CreateResponse::Created(record)) => return Ok(record),
                Ok(CreateResponse::Rejected { status, body }) => {
                    tracing::debug!("Creating {} rejected with {}", request.name, status);
                    body
                }
                Err(e) => return Err(unclassified(e)),
            };

            match serde_json::from_str::<ApiError>(&body) {
                Ok(error) => return Err(rejection(request, error, body)),
                Err(e) if !retried => {
                    tracing::debug!("Unreadable error body ({}), retrying {}", e, request.name);
                    retried = true;
                    tokio::time::sleep(self.settings.create_retry_delay).await;
                }
                Err(_) => {
                    return Err(OrchestrationError::TunnelRejectedOpaque {
                        project: request.name.clone(),
                        addr: request.addr.clone(),
                        body,
                    })
                }
            }
        }
    }
}

/// Region to launch the daemon in: the first non-empty one in project order
pub fn first_region(configs: &BTreeMap<String, EndpointConfig>) -> Option<String> {
    let mut regions = configs
        .iter()
        .filter_map(|(name, config)| {
            config
                .region
                .as_deref()
                .map(str::trim)
                .filter(|region| !region.is_empty())
                .map(|region| (name, region))
        });

    let (name, chosen) = regions.next()?;
    for (other, region) in regions {
        if region != chosen {
            tracing::debug!(
                "Ignoring region {} of {}; using {} from {}",
                region,
                other,
                chosen,
                name
            );
        }
    }
    Some(chosen.to_string())
}

fn rejection(request: &TunnelRequest, error: ApiError, body: String) -> OrchestrationError {
    match error.detail() {
        Some(detail) => OrchestrationError::TunnelRejected {
            project: request.name.clone(),
            addr: request.addr.clone(),
            code: error.error_code,
            message: error.msg,
            detail,
        },
        None => OrchestrationError::TunnelRejectedOpaque {
            project: request.name.clone(),
            addr: request.addr.clone(),
            body,
        },
    }
}

fn unclassified(err: ControlApiError) -> OrchestrationError {
    OrchestrationError::Unclassified(err.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
