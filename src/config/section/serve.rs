//! `[serve]` section configuration.
//!
//! Contains HTTP host settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5288                 # HTTP port number
//! root = "public"             # Static directory to serve
//! # upstream = "http://127.0.0.1:3000"   # Proxy to an origin instead of `root`
//! request_timeout = 30        # Seconds before an in-flight transcode is abandoned
//! threads = 4                 # Worker threads for request handling
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// HTTP host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Static directory served when no upstream is configured.
    pub root: PathBuf,

    /// Origin to proxy to. When set, `root` is ignored.
    pub upstream: Option<String>,

    /// Per-request deadline in seconds.
    pub request_timeout: u64,

    /// Request worker threads.
    pub threads: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5288,
            root: PathBuf::from("public"),
            upstream: None,
            request_timeout: 30,
            threads: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config =
            test_parse_config("[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nthreads = 8");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.threads, 8);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 5288);
        assert_eq!(config.serve.request_timeout, 30);
        assert!(config.serve.upstream.is_none());
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_serve_config_upstream() {
        let config = test_parse_config("[serve]\nupstream = \"http://127.0.0.1:3000\"");
        assert_eq!(
            config.serve.upstream.as_deref(),
            Some("http://127.0.0.1:3000")
        );
    }
}
