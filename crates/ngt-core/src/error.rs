//! Core error types for ngrok-tunnels

use std::path::PathBuf;
use thiserror::Error;

/// Canonical message shown when the daemon executable cannot be located
pub const EXECUTABLE_NOT_FOUND_MESSAGE: &str = "ngrok executable not found. Configure the path in the \
     settings or add the location to your PATH.";

/// Errors raised while launching or querying the daemon process
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable is neither at the configured path nor on the search path
    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// The process could not be spawned for any other reason
    #[error("Failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while talking to a running process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Installer-stage failures
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The vendor download page returned a non-success status
    #[error("Error retrieving ngrok download page. ({status})")]
    PageStatus { status: reqwest::StatusCode },

    /// No extraction strategy found a download link
    #[error("Could not find ngrok download URL.")]
    LinkNotFound,

    /// The archive download returned a non-success status
    #[error("Error trying to download {url}. ({status})")]
    ArchiveStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The archive does not contain the daemon executable
    #[error("Archive does not contain {0}")]
    EntryMissing(String),

    /// The archive could not be read
    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Failed writing the extracted executable
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures surfaced by a tunnel orchestration pass.
///
/// The `Display` output of each variant is the message handed to the
/// error reporting sink.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// Daemon binary absent from the configured path and the search path
    #[error("{}", EXECUTABLE_NOT_FOUND_MESSAGE)]
    ExecutableNotFound,

    /// Control API still unreachable after one launch-and-retry cycle
    #[error("Cannot start ngrok. Is it installed and in your PATH? ({0})")]
    DaemonUnreachable(String),

    /// The daemon rejected a tunnel with a structured error body
    #[error("Could not create tunnel for {project} ({addr}): \n[{code}] {message}\nDetails: {detail}")]
    TunnelRejected {
        project: String,
        addr: String,
        code: i64,
        message: String,
        detail: String,
    },

    /// The daemon rejected a tunnel and the body could not be decoded
    #[error("Could not create tunnel for {project} ({addr}): {body}")]
    TunnelRejectedOpaque {
        project: String,
        addr: String,
        body: String,
    },

    /// Anything else
    #[error("Ran into a problem trying to start the ngrok tunnel(s): {0}")]
    Unclassified(String),
}

impl From<ProcessError> for OrchestrationError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::ExecutableNotFound(_) => OrchestrationError::ExecutableNotFound,
            other => OrchestrationError::Unclassified(other.to_string()),
        }
    }
}
