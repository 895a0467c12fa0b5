//! Client for the daemon's local control API

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use ngt_core::types::{TunnelList, TunnelRecord, TunnelRequest};

/// Path of the tunnel collection on the control API
pub const TUNNELS_PATH: &str = "/api/tunnels";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Control API failures
#[derive(Error, Debug)]
pub enum ControlApiError {
    /// Base URL could not be parsed
    #[error("Invalid control API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection refused, timeout, or other transport fault
    #[error("Control API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The daemon answered with a non-success status
    #[error("Control API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The daemon answered 2xx with a body we could not read
    #[error("Unexpected control API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Outcome of a creation request that reached the daemon
#[derive(Debug, Clone, PartialEq)]
pub enum CreateResponse {
    Created(TunnelRecord),
    /// Non-success status; the raw body is kept for error decoding
    Rejected { status: StatusCode, body: String },
}

/// Thin client over `GET`/`POST /api/tunnels`
#[derive(Debug, Clone)]
pub struct ControlApiClient {
    http: reqwest::Client,
    base_url: Url,
    tunnels_url: Url,
}

impl ControlApiClient {
    pub fn new(base_url: &str) -> Result<Self, ControlApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ControlApiError> {
        let invalid = |reason: String| ControlApiError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        let tunnels_url = base_url
            .join(TUNNELS_PATH)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            tunnels_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the daemon's current tunnels
    pub async fn list_tunnels(&self) -> Result<Vec<TunnelRecord>, ControlApiError> {
        let response = self
            .http
            .get(self.tunnels_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ControlApiError::Status { status, body });
        }

        let list: TunnelList = serde_json::from_str(&body)?;
        tracing::debug!("ngrok reports {} tunnel(s)", list.tunnels.len());
        Ok(list.tunnels)
    }

    /// Ask the daemon to open a tunnel.
    ///
    /// Only transport faults and undecodable success bodies are errors; a
    /// rejection comes back as [`CreateResponse::Rejected`].
    pub async fn create_tunnel(
        &self,
        request: &TunnelRequest,
    ) -> Result<CreateResponse, ControlApiError> {
        let response = self
            .http
            .post(self.tunnels_url.clone())
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Ok(CreateResponse::Rejected { status, body });
        }

        let tunnel: TunnelRecord = serde_json::from_str(&body)?;
        Ok(CreateResponse::Created(tunnel))
    }
}
