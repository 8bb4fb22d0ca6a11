//! Enabled/disabled catalog of readable and producible formats.
//!
//! Built once at startup from `[input]` / `[output]` and never mutated.

use super::{FormatKind, ImageFormat, Role};
use crate::config::{InputConfig, OutputConfig};
use crate::utils::mime;

/// Destination priority, highest first. Also the `<source>` order.
const DESTINATION_PRIORITY: [FormatKind; 3] = [FormatKind::Jxl, FormatKind::Avif, FormatKind::WebP];

#[derive(Debug, Clone)]
pub struct FormatRegistry {
    sources: Vec<ImageFormat>,
    destinations: Vec<ImageFormat>,
}

impl FormatRegistry {
    /// Build from explicit catalogs. `destinations` must be in priority order.
    pub fn new(sources: Vec<ImageFormat>, destinations: Vec<ImageFormat>) -> Self {
        debug_assert!(sources.iter().all(|f| f.role == Role::Source));
        debug_assert!(destinations.iter().all(|f| f.role == Role::Destination));
        Self {
            sources,
            destinations,
        }
    }

    pub fn from_config(input: &InputConfig, output: &OutputConfig) -> Self {
        let sources = vec![
            ImageFormat::source(FormatKind::Jpeg, input.jpeg),
            ImageFormat::source(FormatKind::Png, input.png),
            ImageFormat::source(FormatKind::WebP, input.webp),
        ];
        let destinations = DESTINATION_PRIORITY
            .iter()
            .map(|&kind| {
                let enabled = match kind {
                    FormatKind::Jxl => output.jxl,
                    FormatKind::Avif => output.avif,
                    FormatKind::WebP => output.webp,
                    FormatKind::Jpeg | FormatKind::Png => false,
                };
                ImageFormat::destination(kind, enabled)
            })
            .collect();
        Self::new(sources, destinations)
    }

    /// All destination formats in priority order, enabled or not.
    pub fn destinations(&self) -> &[ImageFormat] {
        &self.destinations
    }

    /// Enabled destination formats in priority order.
    pub fn enabled_destinations(&self) -> impl Iterator<Item = &ImageFormat> {
        self.destinations.iter().filter(|f| f.enabled)
    }

    /// Look up a destination by its extension (with or without a leading dot).
    ///
    /// Returns disabled entries too, so callers can tell "unknown" from
    /// "switched off".
    pub fn destination_for_extension(&self, ext: &str) -> Option<&ImageFormat> {
        let ext = ext.trim_start_matches('.');
        self.destinations
            .iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Whether `format` is a known, enabled destination.
    pub fn is_output_allowed(&self, format: &ImageFormat) -> bool {
        self.destinations
            .iter()
            .any(|f| f.kind == format.kind && f.enabled)
    }

    /// Whether the resource named by `filename` (a path or URL) is an
    /// enabled source format. Unknown extensions are never allowed.
    pub fn is_input_allowed(&self, filename: &str) -> bool {
        let mime = mime::from_extension(url_extension(filename));
        self.sources.iter().any(|f| f.enabled && f.mime() == mime)
    }

    /// The enabled source format declared by a Content-Type header value.
    pub fn source_for_content_type(&self, content_type: &str) -> Option<&ImageFormat> {
        let essence = mime::essence(content_type);
        self.sources
            .iter()
            .find(|f| f.enabled && f.mime().eq_ignore_ascii_case(essence))
    }
}

/// Extension of the last path segment of a URL, ignoring query and fragment.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
