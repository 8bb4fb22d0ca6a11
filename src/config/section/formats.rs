//! `[input]` and `[output]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [input]
//! jpeg = true
//! png = true
//! webp = false     # leave existing .webp images alone
//!
//! [output]
//! jxl = false      # never advertise JPEG XL
//! avif = true
//! webp = true
//! ```

use serde::{Deserialize, Serialize};

/// Source formats found in served HTML that may be transcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub jpeg: bool,
    pub png: bool,
    pub webp: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            jpeg: true,
            png: true,
            webp: true,
        }
    }
}

/// Destination formats offered through `<source>` elements.
///
/// Priority is fixed (jxl, avif, webp); these flags only switch entries off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub jxl: bool,
    pub avif: bool,
    pub webp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jxl: true,
            avif: true,
            webp: true,
        }
    }
}
