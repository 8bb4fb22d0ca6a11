//! `[cache]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [cache]
//! enable = true
//! dir = ".cache/pixshift"    # relative to the config file
//! ```
//!
//! Without `dir`, the per-user cache directory is used
//! (e.g. `~/.cache/pixshift` on Linux).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store transcoded images for reuse.
    pub enable: bool,

    /// Storage directory for transcoded images.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: true,
            dir: None,
        }
    }
}

/// Per-user default cache directory, if the platform has one.
pub fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pixshift").map(|dirs| dirs.cache_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_cache_defaults() {
        let config = test_parse_config("");
        assert!(config.cache.enable);
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn test_cache_dir() {
        let config = test_parse_config("[cache]\ndir = \"/var/cache/px\"\nenable = false");
        assert!(!config.cache.enable);
        assert_eq!(config.cache.dir, Some(PathBuf::from("/var/cache/px")));
    }
}
