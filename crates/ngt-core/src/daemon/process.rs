//! Locating, launching and introspecting the ngrok executable

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;

use super::version::DaemonVersion;
use crate::error::ProcessError;

/// Bare executable name resolved through the search path
pub const EXECUTABLE_NAME: &str = if cfg!(windows) { "ngrok.exe" } else { "ngrok" };

/// Argument that makes the daemon print its version and exit
pub const VERSION_FLAG: &str = "--version";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// What to launch and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Visible console with no output capture when true
    pub show_window: bool,
}

/// Options for [`DaemonController::start`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub region: Option<String>,
    pub show_window: bool,
}

/// A daemon process launched by this controller.
///
/// Dropping the handle leaves the daemon running.
#[derive(Debug)]
pub struct DaemonHandle {
    pid: u32,
    child: Option<Child>,
}

impl DaemonHandle {
    /// Wrap an owned child process
    pub fn from_child(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Some(child),
        }
    }

    /// Handle for a process this side does not own (assumed alive)
    pub fn detached(pid: u32) -> Self {
        Self { pid, child: None }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process is still running
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => true,
        }
    }

    /// Kill the process and reap it
    pub fn stop(&mut self) -> io::Result<()> {
        if let Some(child) = self.child.as_mut() {
            if child.try_wait()?.is_none() {
                child.kill()?;
                child.wait()?;
            }
        }
        Ok(())
    }
}

/// Process-execution capability used by [`DaemonController`]
pub trait ProcessLauncher: Send + Sync {
    /// Launch a long-running process without waiting for it
    fn spawn_detached(&self, spec: &LaunchSpec) -> io::Result<DaemonHandle>;

    /// Run a process to completion and return its standard output
    fn run_captured(&self, program: &Path, args: &[&str]) -> io::Result<String>;
}

/// [`ProcessLauncher`] backed by `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, spec: &LaunchSpec) -> io::Result<DaemonHandle> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());

        if spec.show_window {
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                cmd.creation_flags(CREATE_NEW_CONSOLE);
            }
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::null());
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }

        let mut child = cmd.spawn()?;
        if let Some(stdout) = child.stdout.take() {
            drain_to_log(stdout);
        }

        Ok(DaemonHandle::from_child(child))
    }

    fn run_captured(&self, program: &Path, args: &[&str]) -> io::Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).stderr(Stdio::null());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let output = cmd.output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Forward captured daemon output to the log so the pipe never fills up
fn drain_to_log(stdout: ChildStdout) {
    let spawned = std::thread::Builder::new()
        .name("ngrok-stdout".into())
        .spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => tracing::debug!(target: "ngrok", "{}", line),
                    Err(_) => break,
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start ngrok output reader: {}", e);
    }
}

/// Controls the ngrok executable: where it is, which version it is, and
/// launching it.
#[derive(Clone)]
pub struct DaemonController {
    configured_path: Option<PathBuf>,
    search_path: Option<OsString>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl std::fmt::Debug for DaemonController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonController")
            .field("configured_path", &self.configured_path)
            .field("search_path", &self.search_path)
            .finish_non_exhaustive()
    }
}

impl DaemonController {
    /// Controller using real OS processes and the process `PATH`
    pub fn new(executable_path: &str) -> Self {
        Self::with_launcher(executable_path, Arc::new(SystemLauncher))
    }

    pub fn with_launcher(executable_path: &str, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let trimmed = executable_path.trim();
        Self {
            configured_path: (!trimmed.is_empty()).then(|| PathBuf::from(trimmed)),
            search_path: None,
            launcher,
        }
    }

    /// Override the search-path value (same syntax as `PATH`)
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Configured path when it exists on disk, otherwise the bare executable
    /// name for the OS to resolve.
    pub fn resolve_executable_path(&self) -> PathBuf {
        match &self.configured_path {
            Some(path) if path.exists() => path.clone(),
            _ => PathBuf::from(EXECUTABLE_NAME),
        }
    }

    /// Whether the executable exists at the resolved path or on the search path
    pub fn is_installed(&self) -> bool {
        if self.resolve_executable_path().exists() {
            return true;
        }

        let search_path = match &self.search_path {
            Some(value) => Some(value.clone()),
            None => std::env::var_os("PATH"),
        };

        search_path
            .map(|value| std::env::split_paths(&value).any(|dir| dir.join(EXECUTABLE_NAME).is_file()))
            .unwrap_or(false)
    }

    /// Run `ngrok --version` and parse the result.
    ///
    /// `Ok(None)` when the output carries no recognisable version.
    pub fn version(&self) -> Result<Option<DaemonVersion>, ProcessError> {
        let path = self.resolve_executable_path();
        let stdout = self
            .launcher
            .run_captured(&path, &[VERSION_FLAG])
            .map_err(|e| launch_error(path, e))?;

        let version = DaemonVersion::find_in(&stdout);
        if version.is_none() {
            tracing::debug!("No version found in ngrok output: {:?}", stdout.trim());
        }
        Ok(version)
    }

    /// Installed and at least the minimum supported version
    pub fn is_usable(&self) -> bool {
        if !self.is_installed() {
            return false;
        }

        match self.version() {
            Ok(Some(version)) => version.is_supported(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Could not query ngrok version: {}", e);
                false
            }
        }
    }

    /// Launch the daemon with no tunnels of its own.
    ///
    /// Every call spawns a new process; callers keep the returned handle.
    pub fn start(&self, options: &StartOptions) -> Result<DaemonHandle, ProcessError> {
        let spec = LaunchSpec {
            program: self.resolve_executable_path(),
            args: start_args(options.region.as_deref()),
            show_window: options.show_window,
        };

        tracing::debug!("Launching {:?} {:?}", spec.program, spec.args);
        let handle = self
            .launcher
            .spawn_detached(&spec)
            .map_err(|e| launch_error(spec.program.clone(), e))?;

        tracing::info!("Started ngrok (PID: {})", handle.pid());
        Ok(handle)
    }
}

/// Arguments for starting the daemon without default tunnels
pub fn start_args(region: Option<&str>) -> Vec<String> {
    let mut args = vec!["start".to_string(), "--none".to_string()];
    if let Some(region) = region.map(str::trim).filter(|r| !r.is_empty()) {
        args.push("--region".to_string());
        args.push(region.to_string());
    }
    args
}

fn launch_error(path: PathBuf, err: io::Error) -> ProcessError {
    if err.kind() == io::ErrorKind::NotFound {
        ProcessError::ExecutableNotFound(path)
    } else {
        ProcessError::Spawn { path, source: err }
    }
}
