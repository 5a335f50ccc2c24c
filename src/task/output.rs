//! Change-aware output writes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `content` unless the file already holds exactly these bytes.
///
/// Returns whether the file changed. Parent directories are created.
pub fn write_if_changed(path: &Path, content: impl AsRef<[u8]>) -> Result<bool> {
    let content = content.as_ref();
    if fs::read(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Whether `dest` exists and is at least as new as `src`.
///
/// Used to skip expensive re-encodes of unchanged images.
pub fn is_up_to_date(src: &Path, dest: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(src), modified(dest)) {
        (Some(src), Some(dest)) => dest >= src,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_if_changed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("css/index.css");

        assert!(write_if_changed(&path, "a{}").unwrap());
        assert!(!write_if_changed(&path, "a{}").unwrap());
        assert!(write_if_changed(&path, "b{}").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b{}");
    }

    #[test]
    fn test_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.png");
        let dest = dir.path().join("a.webp");
        fs::write(&src, "x").unwrap();
        assert!(!is_up_to_date(&src, &dest));
        fs::write(&dest, "y").unwrap();
        assert!(is_up_to_date(&src, &dest));
    }
}
