//! URL to filesystem path resolution.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL to a file under `root`, handling `index.html`
/// for directories.
///
/// Returns `None` for anything that escapes `root` (`..`, symlinks) or
/// does not exist.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local = root.join(&clean);

    // Canonicalize to resolve symlinks and verify the path stays under root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Normalize URL: strip query and fragment, decode, trim slashes
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default();

    decoded.trim_matches('/').to_string()
}
