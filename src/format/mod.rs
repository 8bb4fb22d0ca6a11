//! Image format catalog.
//!
//! A format is either a *source* (something we are willing to read and
//! transcode from) or a *destination* (something we can produce). WebP is
//! both, so it appears once in each list of the [`FormatRegistry`].

mod registry;

pub use registry::FormatRegistry;

use crate::utils::mime::types;

/// Concrete encoding behind an [`ImageFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Jpeg,
    Png,
    WebP,
    Avif,
    Jxl,
}

impl FormatKind {
    /// Canonical extension (without the leading dot).
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Jxl => "jxl",
        }
    }

    /// MIME type, without parameters.
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => types::JPEG,
            Self::Png => types::PNG,
            Self::WebP => types::WEBP,
            Self::Avif => types::AVIF,
            Self::Jxl => types::JXL,
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether a catalog entry is read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
}

/// One catalog entry: extension, MIME type, role and enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub kind: FormatKind,
    pub role: Role,
    pub enabled: bool,
}

impl ImageFormat {
    pub const fn source(kind: FormatKind, enabled: bool) -> Self {
        Self {
            kind,
            role: Role::Source,
            enabled,
        }
    }

    pub const fn destination(kind: FormatKind, enabled: bool) -> Self {
        Self {
            kind,
            role: Role::Destination,
            enabled,
        }
    }

    #[inline]
    pub const fn extension(&self) -> &'static str {
        self.kind.extension()
    }

    #[inline]
    pub const fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}
