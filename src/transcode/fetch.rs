//! Fetching original images.

use std::fs;
use std::path::PathBuf;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::core::{CancelToken, Cancelled};
use crate::utils::{mime, path::resolve_path};

/// Body bytes plus the content type the origin declared for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("`{0}` not found")]
    NotFound(String),

    #[error("`{url}` answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("request to `{url}` failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Source of original image bytes.
pub trait Fetch: Send + Sync {
    /// Fetch `url` (an origin-relative path, query allowed).
    fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Fetched, FetchError>;
}

// ============================================================================
// DiskFetcher
// ============================================================================

/// Reads originals from a static directory.
#[derive(Debug, Clone)]
pub struct DiskFetcher {
    root: PathBuf,
}

impl DiskFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Fetch for DiskFetcher {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Fetched, FetchError> {
        cancel.check()?;
        let path =
            resolve_path(url, &self.root).ok_or_else(|| FetchError::NotFound(url.to_string()))?;
        let bytes = fs::read(&path).map_err(|err| FetchError::Io(path.clone(), err))?;

        Ok(Fetched {
            bytes,
            content_type: mime::from_path(&path).to_string(),
        })
    }
}

// ============================================================================
// HttpFetcher
// ============================================================================

/// Fetches originals from an HTTP origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    base: String,
}

impl HttpFetcher {
    /// `base` is `scheme://host[:port]`; request paths are appended to it.
    pub fn new(client: reqwest::blocking::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for an origin-relative `url`. Absolute input is
    /// reduced to its path so requests never leave the configured origin.
    fn target(&self, url: &str) -> String {
        if url.starts_with('/') && !url.starts_with("//") {
            return format!("{}{}", self.base, url);
        }
        match url::Url::parse(url) {
            Ok(parsed) => match parsed.query() {
                Some(query) => format!("{}{}?{}", self.base, parsed.path(), query),
                None => format!("{}{}", self.base, parsed.path()),
            },
            Err(_) => format!("{}/{}", self.base, url.trim_start_matches('/')),
        }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Fetched, FetchError> {
        cancel.check()?;
        let target = self.target(url);

        let mut request = self.client.get(&target);
        if let Some(remaining) = cancel.remaining() {
            request = request.timeout(remaining);
        }

        let http_err = |source| FetchError::Http {
            url: target.clone(),
            source,
        };
        let response = request.send().map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.clone(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().map_err(http_err)?.to_vec();

        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}
