//! Opening URLs in the system browser

use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use url::Url;

use crate::provider::Navigator;
use crate::{Error, Result};

/// Programs tried, in order, when no opener is configured
const OPENERS: &[&str] = &["xdg-open", "open", "wslview"];

/// Navigator that hands URLs to the platform opener
#[derive(Debug, Clone)]
pub struct SystemBrowser {
    opener: PathBuf,
}

impl SystemBrowser {
    /// Use `opener` if given, otherwise the first known opener on `PATH`
    ///
    /// # Errors
    ///
    /// Returns error if no opener can be found
    pub fn new(opener: Option<&str>) -> Result<Self> {
        let opener = match opener {
            Some(cmd) => which::which(cmd)
                .map_err(|e| Error::Navigation(format!("opener {cmd} not found: {e}")))?,
            None => OPENERS
                .iter()
                .find_map(|cmd| which::which(cmd).ok())
                .ok_or_else(|| Error::Navigation("no URL opener found on PATH".to_string()))?,
        };

        tracing::debug!(opener = %opener.display(), "browser opener located");
        Ok(Self { opener })
    }
}

impl SystemBrowser {
    /// Start the opener on `target` and reap it from a background thread
    ///
    /// The returned handle yields the exit status, or `None` if waiting failed.
    fn launch(&self, target: &Url) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
        let mut child = Command::new(&self.opener)
            .arg(target.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        thread::Builder::new()
            .name("browser-opener".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => {
                    if !status.success() {
                        tracing::warn!(%status, "browser opener exited with failure");
                    }
                    Some(status)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to wait for browser opener");
                    None
                }
            })
    }
}

impl Navigator for SystemBrowser {
    fn open_url(&mut self, url: &str) -> bool {
        let target = match normalize_url(url) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(url, error = %e, "refusing to open url");
                return false;
            }
        };

        match self.launch(&target) {
            Ok(_) => {
                tracing::info!(url = %target, "opened url");
                true
            }
            Err(e) => {
                tracing::warn!(url = %target, error = %e, "failed to launch browser");
                false
            }
        }
    }
}

/// Turn a spoken address like `example.com` into an absolute web URL
///
/// # Errors
///
/// Returns error if the text cannot form an http(s) URL
pub fn normalize_url(raw: &str) -> Result<Url> {
    let raw = raw.trim().trim_end_matches(['.', ',', '?', '!']);
    if raw.is_empty() {
        return Err(Error::Navigation("empty url".to_string()));
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = Url::parse(&candidate).map_err(|e| Error::Navigation(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(Error::Navigation(format!("unsupported url scheme {scheme}"))),
    }
}
