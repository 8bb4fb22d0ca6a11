//! Where passthrough requests are answered.

use std::fs;
use std::path::PathBuf;

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;

use super::{IncomingRequest, Reply};
use crate::core::CancelToken;
use crate::utils::{mime, path::resolve_path};

/// Request headers never forwarded upstream. `accept-encoding` is dropped
/// so HTML comes back uncompressed and can be rewritten.
const SKIP_REQUEST_HEADERS: [&str; 5] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "accept-encoding",
];

/// Response headers the HTTP host sets itself.
const SKIP_RESPONSE_HEADERS: [&str; 3] = ["connection", "content-length", "transfer-encoding"];

#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("failed to read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("upstream request to `{url}` failed")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub trait Downstream: Send + Sync {
    fn respond(
        &self,
        request: &IncomingRequest,
        cancel: &CancelToken,
    ) -> Result<Reply, DownstreamError>;
}

// ============================================================================
// StaticRoot
// ============================================================================

/// Serves files under a directory.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    root: PathBuf,
}

impl StaticRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Downstream for StaticRoot {
    fn respond(
        &self,
        request: &IncomingRequest,
        _cancel: &CancelToken,
    ) -> Result<Reply, DownstreamError> {
        if !matches!(request.method.to_ascii_uppercase().as_str(), "GET" | "HEAD") {
            return Ok(Reply::text(405, "405 Method Not Allowed").with_header("Allow", "GET, HEAD"));
        }

        let Some(path) = resolve_path(&request.url, &self.root) else {
            return Ok(Reply::text(404, "404 Not Found"));
        };

        let body = if request.is_head() {
            Vec::new()
        } else {
            fs::read(&path).map_err(|e| DownstreamError::Io(path.clone(), e))?
        };
        Ok(Reply::new(200, mime::from_path(&path), body))
    }
}

// ============================================================================
// Upstream
// ============================================================================

/// Proxies requests to an origin server.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::blocking::Client,
    base: String,
}

impl Upstream {
    pub fn new(client: reqwest::blocking::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn target(&self, url: &str) -> String {
        format!("{}/{}", self.base, url.trim_start_matches('/'))
    }
}

impl Downstream for Upstream {
    fn respond(
        &self,
        request: &IncomingRequest,
        cancel: &CancelToken,
    ) -> Result<Reply, DownstreamError> {
        let target = self.target(&request.url);
        let upstream_err = |source| DownstreamError::Upstream {
            url: target.clone(),
            source,
        };

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut builder = self.client.request(method, &target);
        for (name, value) in &request.headers {
            if SKIP_REQUEST_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                builder = builder.header(name, value);
            }
        }
        if let Some(remaining) = cancel.remaining() {
            builder = builder.timeout(remaining);
        }

        let response = builder.send().map_err(upstream_err)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !SKIP_RESPONSE_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let body = response.bytes().map_err(upstream_err)?.to_vec();

        Ok(Reply {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(root: &StaticRoot, url: &str) -> Reply {
        root.respond(&IncomingRequest::get(url), &CancelToken::none())
            .unwrap()
    }

    #[test]
    fn test_static_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "<p>hi</p>").unwrap();

        let reply = get(&StaticRoot::new(dir.path()), "/page.html");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type(), Some(mime::types::HTML));
        assert_eq!(reply.body, b"<p>hi</p>");
    }

    #[test]
    fn test_static_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/index.html"), "index").unwrap();

        let reply = get(&StaticRoot::new(dir.path()), "/blog/");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"index");
    }

    #[test]
    fn test_static_missing_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir(&site).unwrap();
        fs::write(dir.path().join("secret.txt"), "no").unwrap();

        let root = StaticRoot::new(&site);
        assert_eq!(get(&root, "/nope.html").status, 404);
        assert_eq!(get(&root, "/../secret.txt").status, 404);
    }

    #[test]
    fn test_static_rejects_post() {
        let dir = tempfile::tempdir().unwrap();
        let request = IncomingRequest {
            method: "POST".to_string(),
            ..IncomingRequest::get("/")
        };
        let reply = StaticRoot::new(dir.path())
            .respond(&request, &CancelToken::none())
            .unwrap();
        assert_eq!(reply.status, 405);
    }

    #[test]
    fn test_upstream_target() {
        let upstream = Upstream::new(reqwest::blocking::Client::new(), "http://127.0.0.1:8080/");
        assert_eq!(upstream.target("/a/b.html?x=1"), "http://127.0.0.1:8080/a/b.html?x=1");
        assert_eq!(upstream.target("/"), "http://127.0.0.1:8080/");
    }
}
