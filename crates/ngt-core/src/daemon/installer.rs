//! Downloading and unpacking the ngrok executable
//!
//! The download URL is scraped from the vendor's download page. The page
//! layout has changed before, so extraction goes through an ordered list of
//! [`LinkExtractor`] strategies; the first one that finds a link wins.

use std::io::{Cursor, Read};
use std::path::PathBuf;

use bytes::Bytes;
use regex::Regex;

use crate::config::DEFAULT_DOWNLOAD_PAGE;
use crate::error::DownloadError;

/// Target platform of the executable to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Vendor OS token (`windows`, `darwin`, `linux`, ...)
    pub os: String,
    /// Vendor architecture token (`amd64`, `386`, `arm64`, ...)
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Windows, 64-bit or 32-bit
    pub fn windows(is_64bit: bool) -> Self {
        Self::new("windows", if is_64bit { "amd64" } else { "386" })
    }

    /// The platform this binary was built for
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Name of the executable inside the vendor archive
    pub fn executable_name(&self) -> &'static str {
        if self.os == "windows" {
            "ngrok.exe"
        } else {
            "ngrok"
        }
    }
}

/// One way of finding the download link in the vendor page
pub trait LinkExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Raw (still HTML-escaped) href for `platform`, if this layout matches
    fn extract(&self, html: &str, platform: &Platform) -> Option<String>;
}

/// Table layout: one row per platform tagged `id="dl-<os>-<arch>"`, with the
/// download anchor somewhere after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRowExtractor;

impl LinkExtractor for PlatformRowExtractor {
    fn name(&self) -> &'static str {
        "platform-row"
    }

    fn extract(&self, html: &str, platform: &Platform) -> Option<String> {
        let id = format!("dl-{}-{}", platform.os, platform.arch);
        let pattern = format!(r#"(?s)id="{}".*?href="(https?://[^"]*)""#, regex::escape(&id));
        let re = Regex::new(&pattern).ok()?;
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Single anchor layout: `<a id="<os>-dl-link" href="...amd64...">`. The
/// page only publishes the amd64 link; other architectures are derived by
/// swapping the architecture token.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAnchorExtractor;

const PUBLISHED_ARCH: &str = "amd64";

impl LinkExtractor for GenericAnchorExtractor {
    fn name(&self) -> &'static str {
        "generic-anchor"
    }

    fn extract(&self, html: &str, platform: &Platform) -> Option<String> {
        let anchor = format!(
            r#"<a\s[^>]*id="{}-dl-link"[^>]*>"#,
            regex::escape(&platform.os)
        );
        let tag = Regex::new(&anchor).ok()?.find(html)?;

        let href = Regex::new(r#"href="(https?://[^"]*)""#).ok()?;
        let url = href.captures(tag.as_str())?.get(1)?.as_str();

        if platform.arch == PUBLISHED_ARCH {
            Some(url.to_string())
        } else {
            Some(url.replace(PUBLISHED_ARCH, &platform.arch))
        }
    }
}

/// Strategies tried in order by a default [`DaemonInstaller`]
pub fn default_extractors() -> Vec<Box<dyn LinkExtractor>> {
    vec![Box::new(PlatformRowExtractor), Box::new(GenericAnchorExtractor)]
}

/// Decode the HTML entities that show up in vendor hrefs
pub fn unescape_html(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

/// Pull a single entry out of a zip archive held in memory
pub fn extract_entry(archive: &[u8], entry_name: &str) -> Result<Vec<u8>, DownloadError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut entry = match zip.by_name(entry_name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DownloadError::EntryMissing(entry_name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
    entry.read_to_end(&mut data)?;
    Ok(data)
}

/// Fetches the vendor archive and installs the executable from it
pub struct DaemonInstaller {
    client: reqwest::Client,
    download_page: String,
    platform: Platform,
    extractors: Vec<Box<dyn LinkExtractor>>,
    install_dir: Option<PathBuf>,
}

impl std::fmt::Debug for DaemonInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonInstaller")
            .field("download_page", &self.download_page)
            .field("platform", &self.platform)
            .field(
                "extractors",
                &self.extractors.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("install_dir", &self.install_dir)
            .finish()
    }
}

impl Default for DaemonInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonInstaller {
    /// Installer for the current platform using the public download page
    pub fn new() -> Self {
        Self::with_client(
            reqwest::Client::new(),
            DEFAULT_DOWNLOAD_PAGE,
            Platform::current(),
        )
    }

    pub fn with_client(
        client: reqwest::Client,
        download_page: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            client,
            download_page: download_page.into(),
            platform,
            extractors: default_extractors(),
            install_dir: None,
        }
    }

    /// Replace the extraction strategies
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn LinkExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Directory the executable is written to (default: working directory)
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Scrape the vendor page for this platform's download URL
    pub async fn resolve_download_url(&self) -> Result<String, DownloadError> {
        tracing::debug!("Fetching download page {}", self.download_page);
        let response = self.client.get(&self.download_page).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::PageStatus { status });
        }

        let html = response.text().await?;
        for extractor in &self.extractors {
            if let Some(href) = extractor.extract(&html, &self.platform) {
                tracing::debug!("Download link found by {} strategy", extractor.name());
                return Ok(unescape_html(&href));
            }
        }

        Err(DownloadError::LinkNotFound)
    }

    /// Fetch the archive from `url`, resolving it from the vendor page first
    /// when none is given.
    pub async fn download_archive(&self, url: Option<&str>) -> Result<Bytes, DownloadError> {
        let url = match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => self.resolve_download_url().await?,
        };

        tracing::info!("Downloading {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::ArchiveStatus { url, status });
        }

        Ok(response.bytes().await?)
    }

    /// Download the archive and write the executable into the install
    /// directory. Returns the absolute path of the installed file.
    pub async fn install_executable(&self) -> Result<PathBuf, DownloadError> {
        let archive = self.download_archive(None).await?;
        let entry_name = self.platform.executable_name();
        let data = extract_entry(&archive, entry_name)?;

        let cwd = std::env::current_dir()?;
        let dir = match &self.install_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        std::fs::create_dir_all(&dir)?;
        let path = dir.join(entry_name);
        std::fs::write(&path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms)?;
        }

        tracing::info!("Installed ngrok to {}", path.display());
        Ok(path)
    }
}
