// src/unit/source.rs

//! Where `collect` jobs read forecast documents from: files on disk, or
//! `http(s)://` URLs fetched through a [`SourceFetcher`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry of a collect job's `sources` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    /// Interpret a manifest entry. URLs are kept as written; anything else is
    /// a path relative to `root`.
    pub fn resolve(raw: &str, root: &Path) -> Self {
        if is_url(raw) {
            Source::Url(raw.trim().to_string())
        } else {
            Source::File(root.join(raw))
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Source::Url(_))
    }
}

/// `true` for entries starting with `http://` or `https://` (any case).
pub fn is_url(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl From<&str> for Source {
    fn from(raw: &str) -> Self {
        Source::resolve(raw, Path::new(""))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Retrieves the body of a URL source.
///
/// Implementations must treat any non-2xx answer as an error so the collect
/// step fails and the source stays at the head of the pending list.
pub trait SourceFetcher: Send + Sync + fmt::Debug {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// [`SourceFetcher`] backed by a blocking `reqwest` client.
///
/// The scheduler loop is synchronous, so the blocking client is used from
/// the thread that steps the job. Do not construct it on an async worker.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client for collect sources")?;
        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("requesting {url}"))?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(
                url = %url,
                %status,
                body = %body_text,
                "source returned non-2xx status"
            );
            bail!("{url} returned {status}: {body_text}");
        }

        let body = response
            .text()
            .with_context(|| format!("reading response body of {url}"))?;
        debug!(url = %url, %status, bytes = body.len(), "source fetched");
        Ok(body)
    }
}
