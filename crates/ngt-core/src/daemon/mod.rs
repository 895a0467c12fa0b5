//! The external ngrok daemon: version checks, process control and installation

pub mod installer;
pub mod process;
pub mod version;

pub use installer::{
    default_extractors, DaemonInstaller, GenericAnchorExtractor, LinkExtractor, Platform,
    PlatformRowExtractor,
};
pub use process::{
    DaemonController, DaemonHandle, LaunchSpec, ProcessLauncher, StartOptions, SystemLauncher,
    EXECUTABLE_NAME,
};
pub use version::{DaemonVersion, MIN_SUPPORTED_VERSION};
