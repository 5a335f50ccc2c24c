//! Source sets: a base directory plus glob patterns.
//!
//! Patterns match paths relative to the base, with `/` as separator.
//! `*` never crosses a directory boundary; `**/` matches any depth.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source set base.
    pub rel: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SourceSet {
    base: PathBuf,
    globs: GlobSet,
}

impl SourceSet {
    pub fn new(base: impl Into<PathBuf>, patterns: &[&str]) -> Result<Self> {
        Ok(Self {
            base: base.into(),
            globs: build_globset(patterns)?,
        })
    }

    /// Whether a base-relative path belongs to the set.
    pub fn matches(&self, rel: &Path) -> bool {
        self.globs.is_match(rel)
    }

    /// All matching files, sorted by relative path.
    ///
    /// A missing base directory yields an empty list. The walk is serial:
    /// callers already run inside the rayon pool.
    pub fn files(&self) -> Result<Vec<SourceFile>> {
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walk = WalkDir::new(&self.base)
            .sort(true)
            .parallelism(Parallelism::Serial);

        for entry in walk {
            let mut entry =
                entry.with_context(|| format!("failed to walk {}", self.base.display()))?;
            if let Some(err) = entry.read_children_error.take() {
                return Err(err)
                    .with_context(|| format!("failed to read {}", entry.path().display()));
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_str().unwrap_or_default();
            if IGNORED_FILES.contains(&name) {
                continue;
            }

            let path = entry.path();
            let Ok(rel) = path.strip_prefix(&self.base).map(Path::to_path_buf) else {
                continue;
            };
            if self.matches(&rel) {
                files.push(SourceFile { path, rel });
            }
        }

        files.sort_by(|a, b| a.rel.cmp(&b.rel));
        Ok(files)
    }
}

/// Render a relative path with `/` separators.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compile patterns into one set; `*` does not match `/`.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build glob set")
}
