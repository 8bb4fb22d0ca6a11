//! Stable hashing for cache keys using blake3.
//!
//! Keys must stay identical across processes and releases, so the
//! in-memory `FxHasher` is not an option here.
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let key = hash::url_key("/images/a.jpg"); // 64-char hex
//! let fp = hash::fingerprint("/images/a.jpg"); // "a1b2c3d4"
//! ```

/// Compute the hex-encoded blake3 digest of a URL.
#[inline]
pub fn url_key<T: AsRef<[u8]> + ?Sized>(url: &T) -> String {
    hex::encode(blake3::hash(url.as_ref()).as_bytes())
}

/// Short 8-char fingerprint, used in log lines.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    url_key(value)[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_key_is_stable() {
        assert_eq!(url_key("/a.jpg"), url_key("/a.jpg"));
        assert_eq!(url_key("/a.jpg").len(), 64);
    }

    #[test]
    fn test_url_key_distinguishes_urls() {
        assert_ne!(url_key("/a.jpg"), url_key("/b.jpg"));
        assert_ne!(url_key("/a.jpg"), url_key("/a.jpg?v=2"));
    }

    #[test]
    fn test_fingerprint_prefix() {
        let key = url_key("/a.jpg");
        assert_eq!(fingerprint("/a.jpg"), key[..8]);
    }
}
