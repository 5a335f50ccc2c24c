//! Source watcher for the dev server.
//!
//! ```text
//! notify → Debouncer (timing) → WatchTable (routing) → rayon::spawn
//! ```
//!
//! Batches run on the rayon pool, so a slow task never holds up the
//! event loop. A task is never run twice at once: when a batch names a
//! task that is still running, the task is queued and rerun once the
//! running copy finishes.

mod debouncer;
mod table;

pub use table::{WatchBinding, WatchError, WatchTable};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, unbounded};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::graph::{Node, RunReport, TaskGraph, execute};
use crate::logger::{status_detach, status_error, status_success};
use crate::task::{TaskContext, TaskId};
use crate::{debug, log};
use debouncer::Debouncer;

/// Watches the source root and reruns the tasks bound to changed files.
pub struct SourceWatcher {
    rx: Receiver<notify::Result<notify::Event>>,
    /// Kept alive for the lifetime of the loop.
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
    dispatcher: Arc<Dispatcher>,
}

impl SourceWatcher {
    pub fn new(ctx: TaskContext) -> Result<Self> {
        let table = WatchTable::default_for(&ctx.config)?;
        let graph = TaskGraph::new(&ctx.config.tasks);

        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("failed to create file watcher")?;

        let src = ctx.src();
        if src.exists() {
            watcher
                .watch(src, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch {}", src.display()))?;
        } else {
            log!("watch"; "{} does not exist, nothing to watch", src.display());
        }

        for binding in table.bindings() {
            debug!("watch"; "{} -> {}", binding.pattern, binding.task);
        }

        Ok(Self {
            rx,
            _watcher: watcher,
            debouncer: Debouncer::new(),
            dispatcher: Arc::new(Dispatcher::new(table, graph, ctx)),
        })
    }

    /// Event loop; returns once `shutdown` fires or the watcher goes away.
    pub fn run(mut self, shutdown: Receiver<()>) {
        let ctx = &self.dispatcher.ctx;
        log!("watch"; "watching {}", ctx.config.root_relative(ctx.src()).display());

        loop {
            crossbeam::select! {
                recv(self.rx) -> msg => match msg {
                    Ok(Ok(event)) => self.debouncer.add_event(&event),
                    Ok(Err(e)) => log!("watch"; "error: {}", e),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
                default(self.debouncer.sleep_duration()) => {}
            }

            if let Some(batch) = self.debouncer.take_if_ready() {
                let tasks = self.dispatcher.route(&batch);
                if !tasks.is_empty() {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    rayon::spawn(move || {
                        dispatcher.dispatch(tasks);
                    });
                }
            }
        }

        debug!("watch"; "stopped");
    }
}

/// Tasks currently running, and tasks waiting for a running copy.
#[derive(Debug, Default)]
struct InFlight {
    running: FxHashSet<TaskId>,
    pending: FxHashSet<TaskId>,
}

/// Routes changed paths to tasks and runs them, at most one copy per task.
struct Dispatcher {
    table: WatchTable,
    graph: TaskGraph,
    ctx: TaskContext,
    in_flight: Mutex<InFlight>,
}

impl Dispatcher {
    fn new(table: WatchTable, graph: TaskGraph, ctx: TaskContext) -> Self {
        Self {
            table,
            graph,
            ctx,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Tasks bound to `changed`, deduplicated in table order.
    fn route(&self, changed: &[PathBuf]) -> Vec<TaskId> {
        let config = &self.ctx.config;
        let tasks = self
            .table
            .route_all(changed.iter().map(|p| config.root_relative(p)));
        if tasks.is_empty() {
            debug!("watch"; "no task bound to {} changed file(s)", changed.len());
        }
        tasks
    }

    /// Run `tasks` as one parallel group, then any of them queued meanwhile.
    ///
    /// Returns the report of the last group run, or `None` when every task
    /// was already running and got queued.
    fn dispatch(&self, tasks: Vec<TaskId>) -> Option<RunReport> {
        let mut batch = self.claim(tasks);
        let mut last = None;

        while !batch.is_empty() {
            last = Some(self.run_group(&batch));
            batch = self.release(&batch);
        }
        last
    }

    /// Mark the idle tasks as running; queue the busy ones.
    fn claim(&self, tasks: Vec<TaskId>) -> Vec<TaskId> {
        let mut in_flight = self.in_flight.lock();
        let mut claimed = Vec::with_capacity(tasks.len());
        for task in tasks {
            if in_flight.running.insert(task) {
                claimed.push(task);
            } else {
                debug!("watch"; "{} is running, queued", task);
                in_flight.pending.insert(task);
            }
        }
        claimed
    }

    /// Release `finished` and claim the queued tasks that became idle.
    fn release(&self, finished: &[TaskId]) -> Vec<TaskId> {
        let mut in_flight = self.in_flight.lock();
        for task in finished {
            in_flight.running.remove(task);
        }

        let InFlight { running, pending } = &mut *in_flight;
        let mut requeued: Vec<_> = pending
            .iter()
            .copied()
            .filter(|task| !running.contains(task))
            .collect();
        requeued.sort();
        for task in &requeued {
            pending.remove(task);
            running.insert(*task);
        }
        requeued
    }

    fn run_group(&self, tasks: &[TaskId]) -> RunReport {
        let names: Vec<_> = tasks.iter().map(|t| t.name()).collect();
        status_detach();

        let node = Node::Parallel(tasks.iter().copied().map(Node::Task).collect());
        let report = execute(&self.graph, &node, &self.ctx);

        if report.is_success() {
            status_success(&format!("{}: {}", names.join(", "), report.summary()));
        } else {
            let detail: Vec<_> = report
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.name, f.error))
                .collect();
            status_error(&format!("{} failed", names.join(", ")), &detail.join("\n"));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::task::testing::Project;

    fn dispatcher(project: &Project) -> Arc<Dispatcher> {
        let watcher = SourceWatcher::new(project.ctx(BuildMode::DEVELOPMENT)).unwrap();
        Arc::clone(&watcher.dispatcher)
    }

    #[test]
    fn test_dispatch_runs_bound_tasks() {
        let project = Project::new();
        let a = project.write("src/js/a.js", "var answer = 40 + 2;");
        let page = project.write("src/index.html", "<p>  hi  </p>");

        let dispatcher = dispatcher(&project);
        let tasks = dispatcher.route(&[a, page]);
        let report = dispatcher.dispatch(tasks).unwrap();

        assert!(report.is_success());
        let ran: Vec<_> = report.tasks.iter().map(|t| t.task).collect();
        assert_eq!(ran.len(), 2);
        assert!(ran.contains(&TaskId::Js) && ran.contains(&TaskId::Html));
        assert!(project.read("dist/js/index.min.js").contains("answer"));
        assert!(project.exists("dist/index.html"));
        assert!(dispatcher.in_flight.lock().running.is_empty());
    }

    #[test]
    fn test_dispatch_ignores_unbound() {
        let project = Project::new();
        let notes = project.write("src/notes.txt", "todo");

        let dispatcher = dispatcher(&project);
        assert!(dispatcher.route(&[notes]).is_empty());
        assert!(!project.exists("dist"));
    }

    #[test]
    fn test_batch_runs_while_another_is_running() {
        let project = Project::new();
        let script = project.write("src/js/a.js", "window.a = 1;");
        let page = project.write("src/index.html", "<p>hi</p>");
        let dispatcher = dispatcher(&project);

        // First batch still running `html`
        assert_eq!(dispatcher.claim(vec![TaskId::Html]), vec![TaskId::Html]);

        let report = dispatcher.dispatch(dispatcher.route(&[script])).unwrap();
        assert_eq!(report.tasks.len(), 1);
        assert!(project.exists("dist/js/index.min.js"));

        // Same task again: queued, not run twice at once
        assert!(dispatcher.dispatch(dispatcher.route(&[page])).is_none());
        assert!(!project.exists("dist/index.html"));

        // The running copy finishing picks the queued one up
        assert_eq!(dispatcher.release(&[TaskId::Html]), vec![TaskId::Html]);
        assert!(dispatcher.in_flight.lock().pending.is_empty());
    }

    #[test]
    fn test_spawned_batches_overlap() {
        use std::sync::Barrier;

        let project = Project::new();
        project.write("src/js/a.js", "window.a = 1;");
        project.write("src/index.html", "<p>hi</p>");
        let dispatcher = dispatcher(&project);

        // Both batches must be in flight together for the barrier to open
        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = unbounded();
        for task in [TaskId::Js, TaskId::Html] {
            let (dispatcher, barrier, tx) = (Arc::clone(&dispatcher), Arc::clone(&barrier), tx.clone());
            std::thread::spawn(move || {
                let claimed = dispatcher.claim(vec![task]);
                barrier.wait();
                let report = dispatcher.run_group(&claimed);
                dispatcher.release(&claimed);
                tx.send(report.is_success()).unwrap();
            });
        }

        let results: Vec<_> = rx.iter().take(2).collect();
        assert_eq!(results, vec![true, true]);
        assert!(project.exists("dist/js/index.min.js"));
        assert!(project.exists("dist/index.html"));
    }

    #[test]
    fn test_missing_src_is_not_fatal() {
        let project = Project::new();
        assert!(SourceWatcher::new(project.ctx(BuildMode::DEVELOPMENT)).is_ok());
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let project = Project::new();
        project.write("src/index.html", "");
        let watcher = SourceWatcher::new(project.ctx(BuildMode::DEVELOPMENT)).unwrap();

        let (tx, rx) = unbounded();
        tx.send(()).unwrap();
        watcher.run(rx);
    }
}
