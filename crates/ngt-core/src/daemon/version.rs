//! Daemon version parsing and gating

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Oldest daemon release whose control API the orchestrator supports
pub const MIN_SUPPORTED_VERSION: DaemonVersion = DaemonVersion::new(2, 3, 34);

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("valid version pattern"))
}

/// Semantic version triple reported by `ngrok --version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DaemonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl DaemonVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `x.y.z` triple from arbitrary process output
    pub fn find_in(output: &str) -> Option<Self> {
        version_pattern()
            .find(output)
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Whether this version meets [`MIN_SUPPORTED_VERSION`]
    pub fn is_supported(&self) -> bool {
        *self >= MIN_SUPPORTED_VERSION
    }
}

impl FromStr for DaemonVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |label: &str| -> Result<u32, String> {
            parts
                .next()
                .ok_or_else(|| format!("missing {} component in {:?}", label, s))?
                .parse::<u32>()
                .map_err(|e| format!("invalid {} component in {:?}: {}", label, s, e))
        };

        let version = Self::new(next("major")?, next("minor")?, next("patch")?);
        if parts.next().is_some() {
            return Err(format!("too many components in {:?}", s));
        }
        Ok(version)
    }
}

impl fmt::Display for DaemonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
