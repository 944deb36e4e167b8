//! URL to filesystem path resolution.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL to a file under `serve_root`.
///
/// Directories resolve to their `index.html`. Anything that escapes the
/// root, directly or through a symlink, resolves to `None`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|part| part == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    (canonical.is_dir() && index.is_file()).then_some(index)
}

/// Request path without query string, percent-decoded, slashes trimmed.
pub fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}
