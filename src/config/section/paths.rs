//! `[paths]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! src = "src"     # Source tree (html, scss, css, js, img, fonts)
//! dist = "dist"   # Output tree served by the dev server
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source root.
    pub src: PathBuf,
    /// Output root. Everything below it is deleted by `clear`.
    pub dist: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: "src".into(),
            dist: "dist".into(),
        }
    }
}

impl PathsConfig {
    pub const SRC: FieldPath = FieldPath::new("paths.src");
    pub const DIST: FieldPath = FieldPath::new("paths.dist");

    /// Make both roots absolute against the project root.
    pub fn normalize(&mut self, root: &Path) {
        if self.src.is_relative() {
            self.src = root.join(&self.src);
        }
        if self.dist.is_relative() {
            self.dist = root.join(&self.dist);
        }
    }

    /// `clear` wipes `dist`, so it must never overlap with `src`.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.dist.as_os_str().is_empty() {
            diag.error(Self::DIST, "output directory must not be empty");
            return;
        }
        if self.src.starts_with(&self.dist) {
            diag.error_with_hint(
                Self::DIST,
                format!(
                    "output directory `{}` contains the source directory",
                    self.dist.display()
                ),
                "`clear` deletes everything below `paths.dist`",
            );
        } else if self.dist.starts_with(&self.src) {
            diag.error(
                Self::DIST,
                format!(
                    "output directory `{}` is inside the source directory",
                    self.dist.display()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let paths = PathsConfig::default();
        assert_eq!(paths.src, PathBuf::from("src"));
        assert_eq!(paths.dist, PathBuf::from("dist"));
    }

    #[test]
    fn test_normalize() {
        let mut paths = PathsConfig::default();
        paths.normalize(Path::new("/site"));
        assert_eq!(paths.src, PathBuf::from("/site/src"));
        assert_eq!(paths.dist, PathBuf::from("/site/dist"));
    }

    #[test]
    fn test_overlap_rejected() {
        let paths = PathsConfig {
            src: "/site/src".into(),
            dist: "/site".into(),
        };
        let mut diag = ConfigDiagnostics::new();
        paths.validate(&mut diag);
        assert!(diag.has_errors());

        let paths = PathsConfig {
            src: "/site/src".into(),
            dist: "/site/src/out".into(),
        };
        let mut diag = ConfigDiagnostics::new();
        paths.validate(&mut diag);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_disjoint_accepted() {
        let mut paths = PathsConfig::default();
        paths.normalize(Path::new("/site"));
        let mut diag = ConfigDiagnostics::new();
        paths.validate(&mut diag);
        assert!(!diag.has_errors());
    }
}
