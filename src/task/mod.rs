//! File transform tasks.
//!
//! # Module Structure
//!
//! ```text
//! task/
//! ├── mod.rs       # TaskId, TaskContext, TaskReport, run_task (this file)
//! ├── layout.rs    # Destination tree under the output root
//! ├── source.rs    # SourceSet: base directory + globs
//! ├── output.rs    # Change-aware writes
//! ├── html.rs      # html
//! ├── style.rs     # style (scss or plain css)
//! ├── script.rs    # js
//! ├── image.rs     # img
//! ├── convert.rs   # webp, avif
//! ├── copy.rs      # copy
//! ├── clear.rs     # clear
//! └── critical/    # critical
//! ```
//!
//! Each task reads its sources, runs its transforms and writes below the
//! output root. A file that fails to transform is logged and recorded in
//! the [`TaskReport`]; the task itself still succeeds. Task-level errors
//! (a failed clean, a failing optimizer command) are returned as `Err`.

mod clear;
mod convert;
mod copy;
mod critical;
mod html;
mod image;
mod layout;
mod output;
mod script;
mod source;
mod style;

pub use layout::Layout;
pub use source::{SourceFile, SourceSet, build_globset, slash_path};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rayon::prelude::*;

use crate::config::{ProjectConfig, StyleStrategy};
use crate::core::BuildMode;
use crate::log;
use crate::reload::{Notification, Notifier, NoopNotifier};

/// Built-in task names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Html,
    Style,
    Js,
    Img,
    Webp,
    Avif,
    Copy,
    Clear,
    Critical,
    Server,
}

impl TaskId {
    pub const ALL: [TaskId; 10] = [
        Self::Html,
        Self::Style,
        Self::Js,
        Self::Img,
        Self::Webp,
        Self::Avif,
        Self::Copy,
        Self::Clear,
        Self::Critical,
        Self::Server,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Style => "style",
            Self::Js => "js",
            Self::Img => "img",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Copy => "copy",
            Self::Clear => "clear",
            Self::Critical => "critical",
            Self::Server => "server",
        }
    }

    /// Resolve a task name. `css` is accepted for `style`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "css" => Some(Self::Style),
            _ => Self::ALL.into_iter().find(|id| id.name() == name),
        }
    }

    /// Tasks that turn sources into outputs and may be bound to watch globs.
    pub const fn is_transform(self) -> bool {
        matches!(
            self,
            Self::Html | Self::Style | Self::Js | Self::Img | Self::Webp | Self::Avif | Self::Copy
        )
    }

    /// Tasks whose reload notifications collapse to one per run.
    pub const fn notify_once(self) -> bool {
        matches!(self, Self::Img | Self::Webp | Self::Avif | Self::Copy)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Html => "minify top-level html pages",
            Self::Style => "compile and minify stylesheets",
            Self::Js => "bundle and minify scripts",
            Self::Img => "copy images, optimized in production",
            Self::Webp => "convert images to webp",
            Self::Avif => "convert images to avif",
            Self::Copy => "copy fonts",
            Self::Clear => "empty the output directory",
            Self::Critical => "inline critical styles into built pages",
            Self::Server => "serve the output with live reload and watch sources",
        }
    }
}

impl TaskId {
    /// Source glob that retriggers a transform task, relative to the
    /// source root.
    pub const fn watch_pattern(self, strategy: StyleStrategy) -> Option<&'static str> {
        match self {
            Self::Html => Some("**/*.html"),
            Self::Style => Some(strategy.pattern()),
            Self::Js => Some(script::PATTERN),
            Self::Img => Some(image::PATTERN),
            Self::Webp | Self::Avif => Some(convert::PATTERN),
            Self::Copy => Some(copy::PATTERN),
            Self::Clear | Self::Critical | Self::Server => None,
        }
    }

    /// Directory a transform task writes into.
    pub fn destination(self, layout: &Layout) -> Option<PathBuf> {
        match self {
            Self::Html => Some(layout.root().to_path_buf()),
            Self::Style => Some(layout.css()),
            Self::Js => Some(layout.js()),
            Self::Img | Self::Webp | Self::Avif => Some(layout.img()),
            Self::Copy => Some(layout.fonts()),
            Self::Clear | Self::Critical | Self::Server => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a task invocation needs.
///
/// The mode is fixed for one graph run and passed by value; no task reads
/// process-wide mode state.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<ProjectConfig>,
    pub mode: BuildMode,
    pub notifier: Arc<dyn Notifier>,
}

impl TaskContext {
    pub fn new(config: Arc<ProjectConfig>, mode: BuildMode) -> Self {
        Self {
            config,
            mode,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.config.dist())
    }

    pub fn src(&self) -> &Path {
        self.config.src()
    }
}

/// A source file that could not be transformed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one task run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskId,
    /// Outputs whose content changed.
    pub written: Vec<PathBuf>,
    /// Outputs that already had identical content.
    pub unchanged: usize,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn new(task: TaskId) -> Self {
        Self {
            task,
            written: Vec::new(),
            unchanged: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Record an output write.
    pub fn output(&mut self, path: PathBuf, changed: bool) {
        if changed {
            self.written.push(path);
        } else {
            self.unchanged += 1;
        }
    }

    /// Log and record a per-file failure.
    pub fn fail(&mut self, path: &Path, err: impl fmt::Display) {
        let message = err.to_string();
        log!("error"; "{}: {}: {}", self.task, path.display(), message);
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            message,
        });
    }

    pub fn outputs(&self) -> usize {
        self.written.len() + self.unchanged
    }
}

/// Why one source file produced no output.
#[derive(Debug)]
pub(crate) enum FileError {
    /// Logged and recorded in the report; the task carries on.
    Skip(anyhow::Error),
    /// Aborts the task.
    Fatal(anyhow::Error),
}

impl FileError {
    pub fn skip(err: impl Into<anyhow::Error>) -> Self {
        Self::Skip(err.into())
    }
}

impl From<anyhow::Error> for FileError {
    fn from(err: anyhow::Error) -> Self {
        Self::Fatal(err)
    }
}

/// Outputs written for one source file: `(path, changed)`.
pub(crate) type FileResult = Result<Vec<(PathBuf, bool)>, FileError>;

/// Transform `files` on the rayon pool and fold the outcomes into `report`.
///
/// Every file is attempted; the first fatal error is returned afterwards.
pub(crate) fn process_files<F>(
    ctx: &TaskContext,
    report: &mut TaskReport,
    files: &[SourceFile],
    transform: F,
) -> Result<()>
where
    F: Fn(&SourceFile) -> FileResult + Sync,
{
    let results: Vec<_> = files.par_iter().map(|file| (file, transform(file))).collect();

    let mut fatal = None;
    for (file, result) in results {
        let shown = ctx.config.root_relative(&file.path);
        match result {
            Ok(outputs) => {
                for (path, changed) in outputs {
                    report.output(path, changed);
                }
            }
            Err(FileError::Skip(err)) => report.fail(shown, format!("{err:#}")),
            Err(FileError::Fatal(err)) => {
                if fatal.is_none() {
                    fatal = Some(err.context(format!("{}", shown.display())));
                }
            }
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Run a single built-in task and notify reload clients of its output.
pub fn run_task(id: TaskId, ctx: &TaskContext) -> Result<TaskReport> {
    let start = Instant::now();
    let mut report = match id {
        TaskId::Html => html::run(ctx)?,
        TaskId::Style => style::run(ctx)?,
        TaskId::Js => script::run(ctx)?,
        TaskId::Img => image::run(ctx)?,
        TaskId::Webp => convert::run_webp(ctx)?,
        TaskId::Avif => convert::run_avif(ctx)?,
        TaskId::Copy => copy::run(ctx)?,
        TaskId::Clear => clear::run(ctx)?,
        TaskId::Critical => critical::run(ctx)?,
        TaskId::Server => {
            crate::serve::run(ctx)?;
            TaskReport::new(TaskId::Server)
        }
    };
    report.elapsed = start.elapsed();

    if id.is_transform() && !report.written.is_empty() {
        let layout = ctx.layout();
        ctx.notifier.notify(Notification {
            task: id,
            paths: report.written.iter().map(|p| layout.url_path(p)).collect(),
            once: id.notify_once(),
            inject: id == TaskId::Style,
        });
    }

    Ok(report)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by task tests.

    use super::*;
    use crate::config::test_config_at;
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::TempDir;

    /// Notifier that keeps every notification.
    #[derive(Default)]
    pub struct Recorder(pub Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, note: Notification) {
            self.0.lock().push(note);
        }
    }

    /// Temporary project with `src/` and `dist/`.
    pub struct Project {
        pub dir: TempDir,
    }

    impl Project {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        pub fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.dir.path().join(rel)).unwrap()
        }

        pub fn exists(&self, rel: &str) -> bool {
            self.dir.path().join(rel).exists()
        }

        pub fn ctx(&self, mode: BuildMode) -> TaskContext {
            self.ctx_with(mode, "")
        }

        pub fn ctx_with(&self, mode: BuildMode, config: &str) -> TaskContext {
            let config = test_config_at(self.dir.path(), config);
            TaskContext::new(Arc::new(config), mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Project, Recorder};
    use super::*;

    #[test]
    fn test_task_names() {
        for id in TaskId::ALL {
            assert_eq!(TaskId::from_name(id.name()), Some(id));
        }
        assert_eq!(TaskId::from_name("css"), Some(TaskId::Style));
        assert_eq!(TaskId::from_name("sass"), None);
    }

    #[test]
    fn test_task_classes() {
        assert!(TaskId::Webp.is_transform());
        assert!(!TaskId::Clear.is_transform());
        assert!(!TaskId::Critical.is_transform());
        assert!(TaskId::Copy.notify_once());
        assert!(!TaskId::Style.notify_once());
    }

    #[test]
    fn test_run_task_notifies_changed_outputs() {
        let project = Project::new();
        project.write("src/index.html", "<p> hi </p>");
        let recorder = Arc::new(Recorder::default());
        let ctx = project
            .ctx(BuildMode::DEVELOPMENT)
            .with_notifier(recorder.clone());

        let report = run_task(TaskId::Html, &ctx).unwrap();
        assert_eq!(report.written.len(), 1);

        // Second run writes identical bytes: no notification
        let report = run_task(TaskId::Html, &ctx).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.unchanged, 1);

        let notes = recorder.0.lock();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].task, TaskId::Html);
        assert_eq!(notes[0].paths, vec!["/index.html".to_string()]);
        assert!(!notes[0].once);
    }

    #[test]
    fn test_style_notification_is_inject() {
        let project = Project::new();
        project.write("src/scss/index.scss", "$c: red;\nbody { color: $c; }");
        let recorder = Arc::new(Recorder::default());
        let ctx = project
            .ctx(BuildMode::PRODUCTION)
            .with_notifier(recorder.clone());

        run_task(TaskId::Style, &ctx).unwrap();
        let notes = recorder.0.lock();
        assert!(notes[0].inject);
        assert_eq!(notes[0].paths, vec!["/css/index.css".to_string()]);
    }
}
