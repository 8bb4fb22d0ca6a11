//! `[webp]`, `[avif]` and `[jxl]` encoder settings.
//!
//! Any `quality` left unset inherits the top-level `quality` value.
//!
//! # Example
//!
//! ```toml
//! quality = 70
//!
//! [webp]
//! lossless = false
//! exact = true          # keep RGB values under transparent pixels
//!
//! [avif]
//! quality = 60
//! alpha_quality = 80
//! speed = 6             # 1 (slow, small) ..= 10 (fast)
//!
//! [jxl]
//! effort = 7            # 1 ..= 9
//! ```

use serde::{Deserialize, Serialize};

/// Default quality when neither the section nor the top level sets one.
pub const DEFAULT_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpConfig {
    pub quality: Option<u8>,
    pub lossless: bool,
    /// Preserve RGB values under fully transparent pixels.
    pub exact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvifConfig {
    pub quality: Option<u8>,
    /// Alpha channel quality; falls back to `quality`.
    pub alpha_quality: Option<u8>,
    pub speed: u8,
}

impl Default for AvifConfig {
    fn default() -> Self {
        Self {
            quality: None,
            alpha_quality: None,
            speed: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JxlConfig {
    pub quality: Option<u8>,
    pub effort: u8,
}

impl Default for JxlConfig {
    fn default() -> Self {
        Self {
            quality: None,
            effort: 7,
        }
    }
}

/// All destination encoder settings, as handed to the transcoder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncodeSettings {
    pub webp: WebpConfig,
    pub avif: AvifConfig,
    pub jxl: JxlConfig,
}

impl EncodeSettings {
    pub fn webp_quality(&self) -> u8 {
        self.webp.quality.unwrap_or(DEFAULT_QUALITY)
    }

    pub fn avif_quality(&self) -> u8 {
        self.avif.quality.unwrap_or(DEFAULT_QUALITY)
    }

    pub fn avif_alpha_quality(&self) -> u8 {
        self.avif.alpha_quality.unwrap_or_else(|| self.avif_quality())
    }

    pub fn jxl_quality(&self) -> u8 {
        self.jxl.quality.unwrap_or(DEFAULT_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_quality_inherits_top_level() {
        let config = test_parse_config("quality = 55\n[avif]\nquality = 40");
        let settings = config.encode_settings();
        assert_eq!(settings.webp_quality(), 55);
        assert_eq!(settings.avif_quality(), 40);
        assert_eq!(settings.avif_alpha_quality(), 40);
        assert_eq!(settings.jxl_quality(), 55);
    }

    #[test]
    fn test_encoder_defaults() {
        let settings = test_parse_config("").encode_settings();
        assert_eq!(settings.webp_quality(), 75);
        assert!(!settings.webp.lossless);
        assert!(!settings.webp.exact);
        assert_eq!(settings.avif.speed, 6);
        assert_eq!(settings.jxl.effort, 7);
    }

    #[test]
    fn test_webp_flags() {
        let settings = test_parse_config("[webp]\nlossless = true\nexact = true").encode_settings();
        assert!(settings.webp.lossless);
        assert!(settings.webp.exact);
    }
}
