//! Response interceptor.
//!
//! Per request:
//!
//! ```text
//! START ─┬─ virtual URL ─┬─ unknown extension ─────────────► 400
//!        │               ├─ disabled destination ──────────► 500 (no fetch)
//!        │               └─ transcode (cache / convert) ───► 200 | 500
//!        │
//!        └─ passthrough ─► downstream ─┬─ text/html ─► rewrite ─► status kept
//!                                      └─ anything else ───────► bytes kept
//! ```

mod downstream;

pub use downstream::{Downstream, DownstreamError, StaticRoot, Upstream};

use std::sync::Arc;

use thiserror::Error;

use crate::core::CancelToken;
use crate::format::FormatRegistry;
use crate::rewrite::Rewriter;
use crate::transcode::{TranscodeError, Transcoder};
use crate::url_codec::{Origin, UrlCodec};
use crate::utils::mime;
use crate::{debug, log};

/// Virtual URLs are content-addressed by their original, so they never go stale.
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000";

// ============================================================================
// Request / reply
// ============================================================================

/// Transport-neutral view of an incoming request.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    pub method: String,
    /// Path plus query, as received.
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl IncomingRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }

    /// Origin the client addressed, from `Host` and `X-Forwarded-Proto`.
    pub fn origin(&self) -> Option<Origin> {
        let host = self.header("host").filter(|h| !h.is_empty())?;
        let scheme = match self.header("x-forwarded-proto") {
            Some(proto) if proto.trim().eq_ignore_ascii_case("https") => "https",
            _ => "http",
        };
        Some(Origin::new(scheme, host))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, mime::types::PLAIN, body.into().into_bytes())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unsupported requested format `{0}`")]
    UnsupportedRequestedFormat(String),

    #[error("format `{0}` is disabled by configuration")]
    FormatDisabled(String),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

impl RequestError {
    pub fn status(&self) -> u16 {
        match self {
            Self::UnsupportedRequestedFormat(_) => 400,
            Self::Downstream(_) => 502,
            Self::FormatDisabled(_) | Self::Transcode(_) => 500,
        }
    }
}

// ============================================================================
// Interceptor
// ============================================================================

pub struct Interceptor {
    codec: UrlCodec,
    registry: Arc<FormatRegistry>,
    rewriter: Rewriter,
    transcoder: Transcoder,
    downstream: Box<dyn Downstream>,
    /// Used when a request carries no `Host` header.
    fallback_origin: Origin,
}

impl Interceptor {
    pub fn new(
        codec: UrlCodec,
        registry: Arc<FormatRegistry>,
        transcoder: Transcoder,
        downstream: Box<dyn Downstream>,
        fallback_origin: Origin,
    ) -> Self {
        let rewriter = Rewriter::new(codec.clone(), Arc::clone(&registry));
        Self {
            codec,
            registry,
            rewriter,
            transcoder,
            downstream,
            fallback_origin,
        }
    }

    /// Handle one request. Failures become status replies; nothing here
    /// takes the process down.
    pub fn handle(&self, request: &IncomingRequest, cancel: &CancelToken) -> Reply {
        match self.try_handle(request, cancel) {
            Ok(reply) => reply,
            Err(err) => {
                let status = err.status();
                match &err {
                    RequestError::Transcode(e) if e.is_cancelled() => {
                        log!("serve"; "{} {}: cancelled", status, request.url);
                    }
                    _ => log!("error"; "{} {}: {:#}", status, request.url, anyhow::Error::from(err)),
                }
                Reply::text(status, status_text(status))
            }
        }
    }

    pub fn try_handle(
        &self,
        request: &IncomingRequest,
        cancel: &CancelToken,
    ) -> Result<Reply, RequestError> {
        match self.codec.decode(&request.url) {
            Ok(decoded) => self.serve_virtual(request, &decoded.original, &decoded.extension, cancel),
            Err(_) => {
                debug!("serve"; "passthrough {}", request.url);
                self.passthrough(request, cancel)
            }
        }
    }

    fn serve_virtual(
        &self,
        request: &IncomingRequest,
        original: &str,
        extension: &str,
        cancel: &CancelToken,
    ) -> Result<Reply, RequestError> {
        let format = self
            .registry
            .destination_for_extension(extension)
            .filter(|_| !extension.is_empty())
            .ok_or_else(|| RequestError::UnsupportedRequestedFormat(extension.to_string()))?;
        if !format.enabled {
            return Err(RequestError::FormatDisabled(extension.to_string()));
        }

        let bytes = self.transcoder.transcode(original, format, cancel)?;
        let body = if request.is_head() { Vec::new() } else { bytes };
        Ok(Reply::new(200, format.mime(), body).with_header("Cache-Control", IMMUTABLE_CACHE_CONTROL))
    }

    fn passthrough(
        &self,
        request: &IncomingRequest,
        cancel: &CancelToken,
    ) -> Result<Reply, RequestError> {
        let mut reply = self.downstream.respond(request, cancel)?;
        if !reply.content_type().is_some_and(mime::is_html) {
            return Ok(reply);
        }

        let Ok(html) = std::str::from_utf8(&reply.body) else {
            debug!("serve"; "non-utf8 html at {}, passing through", request.url);
            return Ok(reply);
        };

        let origin = request
            .origin()
            .unwrap_or_else(|| self.fallback_origin.clone());
        let rewritten = self.rewriter.rewrite_html(html, &origin);
        reply.body = rewritten.into_bytes();
        reply.remove_header("content-length");
        Ok(reply)
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        400 => "400 Bad Request",
        404 => "404 Not Found",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "500 Internal Server Error",
    }
}
