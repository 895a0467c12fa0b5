//! ngt-orchestrator: Tunnel orchestration engine for ngrok-tunnels
//!
//! Talks to the ngrok daemon's local control API, launches the daemon when it
//! is not answering, and creates the tunnels that are configured but not yet
//! forwarded. Errors are delivered to a pluggable reporting sink.

pub mod api;
pub mod orchestrator;
pub mod report;

pub use api::{ControlApiClient, ControlApiError, CreateResponse};
pub use orchestrator::{OrchestratorSettings, PassSummary, TunnelOrchestrator};
pub use report::{ErrorReporter, FnReporter, TracingReporter};
