//! Glob-to-task bindings for the watcher.
//!
//! Patterns are relative to the project root (`src/js/**/*.js`), so the
//! table reads the same way it is printed.

use std::path::Path;

use globset::GlobMatcher;
use thiserror::Error;

use crate::config::ProjectConfig;
use crate::task::{Layout, TaskId, slash_path};

/// Binding that fails validation.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid watch pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("task `{task}` cannot be bound to '{pattern}': not a transform task")]
    NotTransform { pattern: String, task: TaskId },

    #[error("task `{task}` writes outside the output root")]
    Destination { task: TaskId },
}

/// One glob routed to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub pattern: String,
    pub task: TaskId,
}

/// Ordered bindings with their compiled matchers.
#[derive(Debug)]
pub struct WatchTable {
    bindings: Vec<WatchBinding>,
    matchers: Vec<GlobMatcher>,
}

impl WatchTable {
    /// Compile and check `bindings` against the output layout.
    pub fn new(bindings: Vec<WatchBinding>, layout: &Layout) -> Result<Self, WatchError> {
        let mut matchers = Vec::with_capacity(bindings.len());

        for binding in &bindings {
            if !binding.task.is_transform() {
                return Err(WatchError::NotTransform {
                    pattern: binding.pattern.clone(),
                    task: binding.task,
                });
            }

            let dest = binding
                .task
                .destination(layout)
                .ok_or(WatchError::Destination { task: binding.task })?;
            if dest != layout.root() && !layout.contains(&dest) {
                return Err(WatchError::Destination { task: binding.task });
            }

            let glob = globset::GlobBuilder::new(&binding.pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| WatchError::Pattern {
                    pattern: binding.pattern.clone(),
                    message: e.kind().to_string(),
                })?;
            matchers.push(glob.compile_matcher());
        }

        Ok(Self { bindings, matchers })
    }

    /// Default bindings for every transform task.
    pub fn default_for(config: &ProjectConfig) -> Result<Self, WatchError> {
        let src = slash_path(config.root_relative(config.src()));
        let strategy = config.style.strategy;

        let order = [
            TaskId::Html,
            TaskId::Style,
            TaskId::Img,
            TaskId::Js,
            TaskId::Copy,
            TaskId::Webp,
            TaskId::Avif,
        ];
        let bindings = order
            .into_iter()
            .filter_map(|task| {
                let pattern = task.watch_pattern(strategy)?;
                let pattern = if src.is_empty() {
                    pattern.to_string()
                } else {
                    format!("{src}/{pattern}")
                };
                Some(WatchBinding { pattern, task })
            })
            .collect();

        Self::new(bindings, &Layout::new(config.dist()))
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Tasks bound to a root-relative path, deduplicated, in table order.
    pub fn route(&self, rel: &Path) -> Vec<TaskId> {
        self.route_all(std::iter::once(rel))
    }

    /// Tasks bound to any of `paths`, deduplicated, in table order.
    pub fn route_all<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Vec<TaskId> {
        let paths: Vec<&Path> = paths.into_iter().collect();
        let mut tasks = Vec::new();

        for (binding, matcher) in self.bindings.iter().zip(&self.matchers) {
            if tasks.contains(&binding.task) {
                continue;
            }
            if paths.iter().any(|p| matcher.is_match(p)) {
                tasks.push(binding.task);
            }
        }
        tasks
    }
}
