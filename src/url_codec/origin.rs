//! Same-origin test for resource URLs found in served HTML.

use url::Url;

/// The site a page was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: String,
    /// Lowercased `host[:port]`, default port stripped.
    host: String,
}

impl Origin {
    /// Build from a request `Host` header value.
    pub fn new(scheme: &str, host: &str) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        let host = normalize_host(&scheme, host);
        Self { scheme, host }
    }

    #[cfg(test)]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Relative URLs are same-origin. Absolute and protocol-relative URLs
    /// are same-origin when their `host[:port]` matches; anything without
    /// a host (`data:`, `mailto:`) is not.
    pub fn is_same_origin(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        let absolute = if url.starts_with("//") {
            format!("{}:{}", self.scheme, url)
        } else if has_scheme(url) {
            url.to_string()
        } else {
            return true;
        };

        let Ok(parsed) = Url::parse(&absolute) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        authority.eq_ignore_ascii_case(&self.host)
    }
}

fn normalize_host(scheme: &str, host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    let default_port = match scheme {
        "https" => ":443",
        _ => ":80",
    };
    match host.strip_suffix(default_port) {
        Some(bare) if !bare.is_empty() => bare.to_string(),
        _ => host,
    }
}

/// `scheme:` prefix per RFC 3986 (letter, then letters/digits/`+-.`).
fn has_scheme(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
