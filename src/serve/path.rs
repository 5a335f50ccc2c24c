//! URL to filesystem path resolution.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL below `root`, serving `index.html` for directories.
///
/// Paths escaping `root` (`..`, symlinks) resolve to `None`.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let canonical = root.join(&clean).canonicalize().ok()?;
    let root = root.canonicalize().ok()?;
    if !canonical.starts_with(&root) {
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

/// Strip query and fragment, percent-decode, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/index.css"), "p{}").unwrap();
        fs::create_dir_all(dir.path().join("my docs")).unwrap();
        fs::write(dir.path().join("my docs/index.html"), "").unwrap();
        dir
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/css/index.css?v=2"), "css/index.css");
        assert_eq!(normalize_url("/my%20docs/"), "my docs");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_resolves_files_and_indexes() {
        let dir = site();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolve_path("/", dir.path()), Some(root.join("index.html")));
        assert_eq!(
            resolve_path("/css/index.css", dir.path()),
            Some(root.join("css/index.css"))
        );
        assert_eq!(
            resolve_path("/my%20docs/", dir.path()),
            Some(root.join("my docs/index.html"))
        );
    }

    #[test]
    fn test_rejects_missing_and_traversal() {
        let dir = site();
        assert!(resolve_path("/nope.html", dir.path()).is_none());
        assert!(resolve_path("/css", dir.path()).is_none());
        assert!(resolve_path("/../etc/passwd", dir.path()).is_none());
        assert!(resolve_path("/%2e%2e/etc/passwd", dir.path()).is_none());
    }
}
