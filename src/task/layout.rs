//! Destination tree below the output root.
//!
//! ```text
//! dist/
//! ├── *.html
//! ├── css/
//! ├── js/
//! ├── img/
//! ├── fonts/
//! └── maps/      # development source maps
//! ```

use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn css(&self) -> PathBuf {
        self.root.join("css")
    }

    pub fn js(&self) -> PathBuf {
        self.root.join("js")
    }

    pub fn img(&self) -> PathBuf {
        self.root.join("img")
    }

    pub fn fonts(&self) -> PathBuf {
        self.root.join("fonts")
    }

    pub fn maps(&self) -> PathBuf {
        self.root.join("maps")
    }

    /// Whether `path` lies strictly below the output root.
    ///
    /// Purely lexical; `..` components are rejected.
    pub fn contains(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(rel) => {
                rel.components().next().is_some()
                    && rel.components().all(|c| matches!(c, Component::Normal(_)))
            }
            Err(_) => false,
        }
    }

    /// Server URL path of an output file, e.g. `/css/index.css`.
    pub fn url_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<_> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdirectories() {
        let layout = Layout::new("/site/dist");
        assert_eq!(layout.css(), Path::new("/site/dist/css"));
        assert_eq!(layout.maps(), Path::new("/site/dist/maps"));
    }

    #[test]
    fn test_contains() {
        let layout = Layout::new("/site/dist");
        assert!(layout.contains(Path::new("/site/dist/img/a.png")));
        assert!(!layout.contains(Path::new("/site/dist")));
        assert!(!layout.contains(Path::new("/site/src/a.png")));
        assert!(!layout.contains(Path::new("/site/dist/../src/a.png")));
    }

    #[test]
    fn test_url_path() {
        let layout = Layout::new("/site/dist");
        assert_eq!(
            layout.url_path(Path::new("/site/dist/css/index.css")),
            "/css/index.css"
        );
        assert_eq!(layout.url_path(Path::new("/site/dist/index.html")), "/index.html");
    }
}
