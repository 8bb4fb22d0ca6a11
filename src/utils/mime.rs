//! MIME type detection utilities.
//!
//! Provides consistent MIME type detection for served files and image URLs.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const PDF: &str = "application/pdf";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const JXL: &str = "image/jxl";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    // Video
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
}

/// Guess MIME type from file extension.
///
/// Returns a full MIME type string suitable for HTTP Content-Type header.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string (case-insensitive).
pub fn from_extension(ext: Option<&str>) -> &'static str {
    let Some(ext) = ext else {
        return types::OCTET_STREAM;
    };

    match ext.to_ascii_lowercase().as_str() {
        // Web / Text
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "js" | "mjs" | "cjs" => types::JAVASCRIPT,
        "json" => types::JSON,
        "xml" => types::XML,
        "txt" => types::PLAIN,

        // Images
        "svg" => types::SVG,
        "png" => types::PNG,
        "jpg" | "jpeg" | "jpe" => types::JPEG,
        "gif" => types::GIF,
        "webp" => types::WEBP,
        "avif" => types::AVIF,
        "jxl" => types::JXL,
        "ico" => types::ICO,

        // Video
        "mp4" | "m4v" => types::MP4,
        "webm" => types::WEBM,

        // Fonts
        "woff" => types::WOFF,
        "woff2" => types::WOFF2,

        // Documents / Binary
        "pdf" => types::PDF,
        "wasm" => types::WASM,

        _ => types::OCTET_STREAM,
    }
}

/// Strip parameters from a Content-Type value.
///
/// `"image/jpeg; charset=binary"` -> `"image/jpeg"`
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Check if the Content-Type declares an HTML document.
pub fn is_html(content_type: &str) -> bool {
    essence(content_type).eq_ignore_ascii_case("text/html")
}
