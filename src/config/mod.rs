//! Configuration management for `pixshift.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── cache      # [cache]
//! │   ├── encode     # [webp], [avif], [jxl]
//! │   ├── formats    # [input], [output]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   └── error      # ConfigError, ConfigProblems
//! └── mod.rs         # PixConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section            | Purpose                                          |
//! |--------------------|--------------------------------------------------|
//! | (top level)        | `marker`, default `quality`                      |
//! | `[input]`          | Source formats eligible for transcoding          |
//! | `[output]`         | Destination formats offered to browsers          |
//! | `[webp]` etc.      | Per-encoder knobs                                |
//! | `[cache]`          | Transcode cache location                         |
//! | `[serve]`          | HTTP host (port, interface, root, upstream)      |
//!
//! The file is optional: without one every section takes its defaults.
//! After loading, the config is shared as `Arc<PixConfig>` and never mutated.

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, resolve_against};

// Re-export from section/
pub use section::{
    AvifConfig, CacheConfig, DEFAULT_QUALITY, EncodeSettings, InputConfig, JxlConfig,
    OutputConfig, ServeConfig, WebpConfig, default_cache_dir,
};

// Re-export from types/
pub use types::{ConfigError, ConfigProblems};

use crate::{
    cli::{Cli, Commands, ServeArgs},
    format::FormatRegistry,
    log,
    url_codec::UrlCodec,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Marker used when none is configured.
pub const DEFAULT_MARKER: &str = "pixshift";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pixshift.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PixConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths are resolved against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Literal token that marks a virtual URL.
    pub marker: String,

    /// Default encoder quality, inherited by sections that leave it unset.
    pub quality: u8,

    pub input: InputConfig,
    pub output: OutputConfig,
    pub webp: WebpConfig,
    pub avif: AvifConfig,
    pub jxl: JxlConfig,
    pub cache: CacheConfig,
    pub serve: ServeConfig,
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            root: PathBuf::new(),
            marker: DEFAULT_MARKER.to_string(),
            quality: DEFAULT_QUALITY,
            input: InputConfig::default(),
            output: OutputConfig::default(),
            webp: WebpConfig::default(),
            avif: AvifConfig::default(),
            jxl: JxlConfig::default(),
            cache: CacheConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl PixConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. Relative paths in the
    /// file are resolved against the file's directory; without a file they
    /// resolve against cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = Some(path);
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        if let Commands::Serve { args } = &cli.command {
            config.apply_serve_args(args);
        }
        config.finalize();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // derived values
    // ========================================================================

    /// Encoder settings with inherited qualities filled in.
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            webp: self.webp,
            avif: self.avif,
            jxl: self.jxl,
        }
    }

    pub fn registry(&self) -> FormatRegistry {
        FormatRegistry::from_config(&self.input, &self.output)
    }

    pub fn url_codec(&self) -> UrlCodec {
        UrlCodec::new(&self.marker)
    }

    /// Upstream origin, trimmed of a trailing slash.
    pub fn upstream(&self) -> Option<&str> {
        self.serve
            .upstream
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply serve-specific options.
    fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());

        if let Some(root) = &args.root {
            // CLI paths are relative to cwd, not to the config file
            self.serve.root = std::env::current_dir()
                .map(|cwd| resolve_against(&cwd, root))
                .unwrap_or_else(|_| root.clone());
        }
        if let Some(upstream) = &args.upstream {
            self.serve.upstream = Some(upstream.clone());
        }
        if args.no_cache {
            self.cache.enable = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // finalization
    // ========================================================================

    /// Fill inherited values and resolve relative paths.
    fn finalize(&mut self) {
        self.inherit_quality();

        self.serve.root = resolve_against(&self.root, &self.serve.root);
        if let Some(dir) = self.cache.dir.take() {
            self.cache.dir = Some(resolve_against(&self.root, &dir));
        }
    }

    fn inherit_quality(&mut self) {
        let quality = self.quality;
        self.webp.quality.get_or_insert(quality);
        self.avif.quality.get_or_insert(quality);
        self.jxl.quality.get_or_insert(quality);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all problems and returns them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = ConfigProblems::new();

        if self.marker.is_empty() {
            problems.error("marker", "must not be empty");
        } else if !self
            .marker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            problems.error(
                "marker",
                format!(
                    "`{}` may only contain ASCII letters, digits, `-` and `_`",
                    self.marker
                ),
            );
        }

        Self::check_quality(&mut problems, "quality", Some(self.quality));
        Self::check_quality(&mut problems, "webp.quality", self.webp.quality);
        Self::check_quality(&mut problems, "avif.quality", self.avif.quality);
        Self::check_quality(&mut problems, "avif.alpha_quality", self.avif.alpha_quality);
        Self::check_quality(&mut problems, "jxl.quality", self.jxl.quality);

        if !(1..=10).contains(&self.avif.speed) {
            problems.error("avif.speed", format!("{} is outside 1..=10", self.avif.speed));
        }
        if !(1..=9).contains(&self.jxl.effort) {
            problems.error("jxl.effort", format!("{} is outside 1..=9", self.jxl.effort));
        }
        if self.serve.threads == 0 {
            problems.error("serve.threads", "must be at least 1");
        }
        if self.serve.request_timeout == 0 {
            problems.error("serve.request_timeout", "must be at least 1 second");
        }
        if let Some(upstream) = self.upstream() {
            match url::Url::parse(upstream) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => problems.error(
                    "serve.upstream",
                    format!("unsupported scheme `{}`", url.scheme()),
                ),
                Err(err) => problems.error("serve.upstream", format!("`{upstream}`: {err}")),
            }
        }

        problems.into_result()
    }

    fn check_quality(problems: &mut ConfigProblems, field: &'static str, value: Option<u8>) {
        if let Some(q) = value
            && q > 100
        {
            problems.error(field, format!("{q} is outside 0..=100"));
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config and fill inherited values.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PixConfig {
    let (mut parsed, ignored) = PixConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.inherit_quality();
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = PixConfig::from_str("[serve\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config() {
        let config = PixConfig::default();
        assert_eq!(config.marker, "pixshift");
        assert_eq!(config.quality, 75);
        assert!(config.config_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "marker = \"px\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = PixConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.marker, "px");
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "marker = \"px\"\nquality = 80\n[output]\nwebp = false";
        let (_, ignored) = PixConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let config = test_parse_config(
            "marker = \"a.b\"\nquality = 120\n[avif]\nspeed = 0\n[jxl]\neffort = 10",
        );
        let Err(ConfigError::Validation(problems)) = config.validate() else {
            panic!("expected validation failure");
        };
        let fields: Vec<_> = problems.fields().collect();
        assert!(fields.contains(&"marker"));
        assert!(fields.contains(&"quality"));
        assert!(fields.contains(&"avif.speed"));
        assert!(fields.contains(&"jxl.effort"));
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let config = test_parse_config("marker = \"\"");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_upstream_scheme() {
        let config = test_parse_config("[serve]\nupstream = \"ftp://example.com\"");
        assert!(config.validate().is_err());

        let config = test_parse_config("[serve]\nupstream = \"https://example.com/\"");
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream(), Some("https://example.com"));
    }

    #[test]
    fn test_apply_serve_args() {
        let mut config = PixConfig::default();
        let args = ServeArgs {
            port: Some(9000),
            upstream: Some("http://127.0.0.1:3000".into()),
            no_cache: true,
            ..ServeArgs::default()
        };
        config.apply_serve_args(&args);

        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.upstream(), Some("http://127.0.0.1:3000"));
        assert!(!config.cache.enable);
        // untouched
        assert_eq!(config.serve.threads, 4);
    }

    #[test]
    fn test_finalize_resolves_paths() {
        let mut config = test_parse_config("[serve]\nroot = \"dist\"\n[cache]\ndir = \"cache\"");
        config.root = PathBuf::from("/site");
        config.finalize();

        assert_eq!(config.serve.root, PathBuf::from("/site/dist"));
        assert_eq!(config.cache.dir, Some(PathBuf::from("/site/cache")));
    }

    #[test]
    fn test_registry_follows_output_flags() {
        let config = test_parse_config("[output]\njxl = false");
        let registry = config.registry();
        let enabled: Vec<_> = registry
            .enabled_destinations()
            .map(|f| f.extension())
            .collect();
        assert_eq!(enabled, vec!["avif", "webp"]);
    }
}
