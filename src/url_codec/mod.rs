//! Virtual URL codec.
//!
//! A virtual URL names an original resource plus the format it should be
//! served in:
//!
//! ```text
//! /img/a.jpg?v=2          original
//! /img/a.jpg.px.avif?v=2  virtual (marker "px", destination "avif")
//! ```
//!
//! Only the path component is touched; scheme, authority, query and
//! fragment pass through verbatim. A path that happens to contain a
//! `.`-delimited segment equal to the marker is indistinguishable from a
//! virtual URL. Pick a marker that does not occur in real paths.

mod origin;

pub use origin::Origin;

use thiserror::Error;

use crate::format::ImageFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlCodecError {
    /// No marker segment in the path. Expected for ordinary requests.
    #[error("`{0}` is not a virtual URL")]
    NotVirtualUrl(String),
}

/// Result of decoding a virtual URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The original URL, with query and fragment restored.
    pub original: String,
    /// Everything after the marker segment, without the leading dot.
    /// May be empty or unknown; resolving it is the caller's job.
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct UrlCodec {
    marker: String,
    opt_out_attr: String,
}

impl UrlCodec {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            opt_out_attr: format!("data-{}-ignore", marker.to_ascii_lowercase()),
        }
    }

    /// Attribute that excludes an element and its subtree from rewriting.
    pub fn opt_out_attr(&self) -> &str {
        &self.opt_out_attr
    }

    /// Append `.<marker>.<ext>` to the path of `original`.
    ///
    /// An absolute URL without a path gets `/` as its path first.
    pub fn encode(&self, original: &str, format: &ImageFormat) -> String {
        let (prefix, path, suffix) = split_url(original);
        let path = if path.is_empty() && !prefix.is_empty() {
            "/"
        } else {
            path
        };

        let mut out = String::with_capacity(
            original.len() + self.marker.len() + format.extension().len() + 3,
        );
        out.push_str(prefix);
        out.push_str(path);
        out.push('.');
        out.push_str(&self.marker);
        out.push('.');
        out.push_str(format.extension());
        out.push_str(suffix);
        out
    }

    /// Recover the original URL and requested extension.
    pub fn decode(&self, url: &str) -> Result<Decoded, UrlCodecError> {
        let (prefix, path, suffix) = split_url(url);
        let not_virtual = || UrlCodecError::NotVirtualUrl(url.to_string());

        let marker_at = self.find_marker(path).ok_or_else(not_virtual)?;
        let original_path = &path[..marker_at - 1];
        let extension = path[marker_at + self.marker.len()..].trim_start_matches('.');

        Ok(Decoded {
            original: format!("{prefix}{original_path}{suffix}"),
            extension: extension.to_string(),
        })
    }

    /// Whether `url` carries the marker. Never fails.
    pub fn is_virtual(&self, url: &str) -> bool {
        let (_, path, _) = split_url(url);
        self.find_marker(path).is_some()
    }

    /// Byte offset of the first `.`-delimited segment equal to the marker.
    /// The first segment never counts: something must precede the marker.
    fn find_marker(&self, path: &str) -> Option<usize> {
        let mut offset = 0;
        for (i, segment) in path.split('.').enumerate() {
            if i > 0 && segment == self.marker {
                return Some(offset);
            }
            offset += segment.len() + 1;
        }
        None
    }
}

/// Split a URL into `(scheme://authority, path, ?query#fragment)`.
fn split_url(url: &str) -> (&str, &str, &str) {
    let suffix_start = url.find(['?', '#']).unwrap_or(url.len());
    let (head, suffix) = url.split_at(suffix_start);
    let path_start = authority_end(head);
    (&head[..path_start], &head[path_start..], suffix)
}

fn authority_end(head: &str) -> usize {
    let after = if head.starts_with("//") {
        2
    } else {
        match head.find("://") {
            Some(i) if is_scheme(&head[..i]) => i + 3,
            _ => return 0,
        }
    };
    head[after..].find('/').map_or(head.len(), |i| after + i)
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatKind;

    fn avif() -> ImageFormat {
        ImageFormat::destination(FormatKind::Avif, true)
    }

    fn jxl() -> ImageFormat {
        ImageFormat::destination(FormatKind::Jxl, true)
    }

    #[test]
    fn test_encode_relative() {
        let codec = UrlCodec::new("px");
        assert_eq!(codec.encode("a.jpg", &avif()), "a.jpg.px.avif");
        assert_eq!(codec.encode("/img/a.jpg", &jxl()), "/img/a.jpg.px.jxl");
    }

    #[test]
    fn test_encode_keeps_query_and_fragment() {
        let codec = UrlCodec::new("px");
        assert_eq!(
            codec.encode("/a.jpg?v=2#top", &avif()),
            "/a.jpg.px.avif?v=2#top"
        );
    }

    #[test]
    fn test_encode_absolute() {
        let codec = UrlCodec::new("px");
        assert_eq!(
            codec.encode("https://example.com/a.png", &avif()),
            "https://example.com/a.png.px.avif"
        );
        assert_eq!(
            codec.encode("https://example.com", &avif()),
            "https://example.com/.px.avif"
        );
        assert_eq!(
            codec.encode("//cdn.example.com/a.png", &avif()),
            "//cdn.example.com/a.png.px.avif"
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let codec = UrlCodec::new("px");
        for original in [
            "a.jpg",
            "/img/photo.final.png",
            "/a.jpg?v=1&w=2",
            "https://example.com:8080/x/y.webp#frag",
            "//example.com/p.jpeg",
        ] {
            for format in [avif(), jxl()] {
                let encoded = codec.encode(original, &format);
                let decoded = codec.decode(&encoded).unwrap();
                assert_eq!(decoded.original, original);
                assert_eq!(decoded.extension, format.extension());
            }
        }
    }

    #[test]
    fn test_encode_injective() {
        let codec = UrlCodec::new("px");
        let a = codec.encode("/a.jpg", &avif());
        let b = codec.encode("/a.jpeg", &avif());
        let c = codec.encode("/b/a.jpg", &avif());
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_decode_not_virtual() {
        let codec = UrlCodec::new("px");
        assert_eq!(
            codec.decode("/a.jpg"),
            Err(UrlCodecError::NotVirtualUrl("/a.jpg".into()))
        );
        // marker only counts as a whole segment
        assert!(codec.decode("/a.pxx.avif").is_err());
        assert!(codec.decode("/px/a.avif").is_err());
        // query does not count
        assert!(codec.decode("/a.jpg?x=.px.avif").is_err());
    }

    #[test]
    fn test_decode_malformed_is_typed() {
        let codec = UrlCodec::new("px");
        let decoded = codec.decode("/a.jpg.px").unwrap();
        assert_eq!(decoded.original, "/a.jpg");
        assert_eq!(decoded.extension, "");

        let decoded = codec.decode("/a.jpg.px.tar.gz").unwrap();
        assert_eq!(decoded.extension, "tar.gz");
    }

    #[test]
    fn test_decode_first_marker_wins() {
        let codec = UrlCodec::new("px");
        let decoded = codec.decode("/a.px.jpg.px.avif").unwrap();
        assert_eq!(decoded.original, "/a");
        assert_eq!(decoded.extension, "jpg.px.avif");
    }

    #[test]
    fn test_is_virtual() {
        let codec = UrlCodec::new("pixshift");
        assert!(codec.is_virtual("/a.jpg.pixshift.webp"));
        assert!(codec.is_virtual("https://h/a.png.pixshift.avif?q"));
        assert!(!codec.is_virtual("/a.jpg"));
        assert!(!codec.is_virtual(""));
        assert!(!codec.is_virtual("::not a url::"));
    }

    #[test]
    fn test_opt_out_attr() {
        assert_eq!(UrlCodec::new("px").opt_out_attr(), "data-px-ignore");
    }

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("a.jpg"), ("", "a.jpg", ""));
        assert_eq!(
            split_url("http://h:1/p?q#f"),
            ("http://h:1", "/p", "?q#f")
        );
        assert_eq!(split_url("http://h"), ("http://h", "", ""));
        // not a scheme
        assert_eq!(split_url("/x/1://y"), ("", "/x/1://y", ""));
    }
}
