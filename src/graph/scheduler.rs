//! Graph execution on the rayon pool.

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use rayon::prelude::*;

use super::{Node, TaskGraph};
use crate::core::is_shutdown;
use crate::log;
use crate::task::{TaskContext, TaskId, TaskReport, run_task};

/// A task that returned an error.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a graph run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
    pub failures: Vec<TaskFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn files_written(&self) -> usize {
        self.tasks.iter().map(|t| t.written.len()).sum()
    }

    pub fn files_unchanged(&self) -> usize {
        self.tasks.iter().map(|t| t.unchanged).sum()
    }

    /// Source files that failed to transform.
    pub fn file_failures(&self) -> usize {
        self.tasks.iter().map(|t| t.failures.len()).sum()
    }

    fn merge(&mut self, other: RunReport) {
        self.tasks.extend(other.tasks);
        self.failures.extend(other.failures);
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} tasks, {} written, {} unchanged",
            self.tasks.len(),
            self.files_written(),
            self.files_unchanged()
        );
        let skipped = self.file_failures();
        if skipped > 0 {
            summary.push_str(&format!(", {skipped} skipped"));
        }
        summary.push_str(&format!(" in {:.2?}", self.elapsed));
        summary
    }

    /// Error out when any task failed.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let names: Vec<_> = self.failures.iter().map(|f| f.name.as_str()).collect();
        bail!("{} failed: {}", plural_tasks(names.len()), names.join(", "))
    }
}

fn plural_tasks(n: usize) -> String {
    if n == 1 {
        "1 task".to_string()
    } else {
        format!("{n} tasks")
    }
}

/// Run `node` to completion.
pub fn execute(graph: &TaskGraph, node: &Node, ctx: &TaskContext) -> RunReport {
    let start = Instant::now();
    let mut report = run_node(graph, node, ctx);
    report.elapsed = start.elapsed();
    report
}

/// Validate the graph and run `names` in order.
pub fn run_names(graph: &TaskGraph, names: &[String], ctx: &TaskContext) -> Result<RunReport> {
    graph.validate()?;
    let nodes = names
        .iter()
        .map(|name| graph.resolve(name))
        .collect::<Result<Vec<_>, _>>()?;

    let node = match <[Node; 1]>::try_from(nodes) {
        Ok([node]) => node,
        Err(nodes) => Node::Series(nodes),
    };
    Ok(execute(graph, &node, ctx))
}

fn run_node(graph: &TaskGraph, node: &Node, ctx: &TaskContext) -> RunReport {
    match node {
        Node::Task(id) => run_one(*id, ctx),
        Node::Ref(name) => match graph.composite(name) {
            Some(node) => run_node(graph, node, ctx),
            None => RunReport {
                failures: vec![TaskFailure {
                    name: name.clone(),
                    error: "unknown task".to_string(),
                }],
                ..RunReport::default()
            },
        },
        Node::Parallel(nodes) => {
            let reports: Vec<_> = nodes
                .par_iter()
                .map(|node| run_node(graph, node, ctx))
                .collect();
            let mut merged = RunReport::default();
            for report in reports {
                merged.merge(report);
            }
            merged
        }
        Node::Series(nodes) => {
            let mut merged = RunReport::default();
            for node in nodes {
                let report = run_node(graph, node, ctx);
                let failed = !report.is_success();
                merged.merge(report);
                if failed || is_shutdown() {
                    break;
                }
            }
            merged
        }
    }
}

fn run_one(id: TaskId, ctx: &TaskContext) -> RunReport {
    match run_task(id, ctx) {
        Ok(report) => {
            if id != TaskId::Server {
                log_task(&report);
            }
            RunReport {
                tasks: vec![report],
                ..RunReport::default()
            }
        }
        Err(err) => {
            let error = format!("{err:#}");
            log!("error"; "{}: {}", id, error);
            RunReport {
                failures: vec![TaskFailure {
                    name: id.name().to_string(),
                    error,
                }],
                ..RunReport::default()
            }
        }
    }
}

fn log_task(report: &TaskReport) {
    let mut line = format!("{} written", report.written.len());
    if report.unchanged > 0 {
        line.push_str(&format!(", {} unchanged", report.unchanged));
    }
    if !report.failures.is_empty() {
        line.push_str(&format!(", {} skipped", report.failures.len()));
    }
    log!(report.task.name(); "{} ({:.2?})", line, report.elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::task::testing::Project;

    const FAILING_IMG: &str = "[image]\npng = [\"sh\", \"-c\", \"exit 1\"]";

    #[test]
    fn test_run_base() {
        let project = Project::new();
        project.write("src/index.html", "<p>hi</p>");
        project.write("src/js/main.js", "window.main = 1;");
        project.write("src/fonts/a.woff2", [1u8]);

        let ctx = project.ctx(BuildMode::DEVELOPMENT);
        let graph = TaskGraph::new(&ctx.config.tasks);
        let report = run_names(&graph, &["base".into()], &ctx).unwrap();

        assert!(report.is_success());
        assert_eq!(report.tasks.len(), 7);
        assert!(project.exists("dist/index.html"));
        assert!(project.exists("dist/js/index.min.js"));
        assert!(project.exists("dist/fonts/a.woff2"));
    }

    #[test]
    fn test_unknown_name() {
        let project = Project::new();
        let ctx = project.ctx(BuildMode::DEVELOPMENT);
        let graph = TaskGraph::new(&ctx.config.tasks);
        assert!(run_names(&graph, &["nope".into()], &ctx).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_parallel_finishes_siblings() {
        let project = Project::new();
        project.write("src/img/a.png", [1u8]);
        project.write("src/index.html", "<p>hi</p>");

        let ctx = project.ctx_with(BuildMode::PRODUCTION, FAILING_IMG);
        let graph = TaskGraph::new(&ctx.config.tasks);
        let node = Node::Parallel(vec![Node::Task(TaskId::Img), Node::Task(TaskId::Html)]);
        let report = execute(&graph, &node, &ctx);

        assert!(!report.is_success());
        assert_eq!(report.failures[0].name, "img");
        assert!(project.exists("dist/index.html"));
        assert!(report.into_result().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_series_stops_at_failure() {
        let project = Project::new();
        project.write("src/img/a.png", [1u8]);
        project.write("src/index.html", "<p>hi</p>");

        let ctx = project.ctx_with(BuildMode::PRODUCTION, FAILING_IMG);
        let graph = TaskGraph::new(&ctx.config.tasks);
        let node = Node::Series(vec![Node::Task(TaskId::Img), Node::Task(TaskId::Html)]);
        let report = execute(&graph, &node, &ctx);

        assert_eq!(report.failures.len(), 1);
        assert!(report.tasks.is_empty());
        assert!(!project.exists("dist/index.html"));
    }

    #[test]
    fn test_file_failures_do_not_fail_run() {
        let project = Project::new();
        project.write("src/scss/bad.scss", ".a { color: $nope; }");

        let ctx = project.ctx(BuildMode::PRODUCTION);
        let graph = TaskGraph::new(&ctx.config.tasks);
        let report = execute(&graph, &Node::Task(TaskId::Style), &ctx);
        assert!(report.is_success());
        assert_eq!(report.file_failures(), 1);
        assert!(report.summary().contains("1 skipped"));
    }

    #[test]
    fn test_build_clears_then_critical() {
        let project = Project::new();
        project.write("dist/stale.txt", "old");
        project.write(
            "src/index.html",
            "<html><head><link rel=\"stylesheet\" href=\"css/index.css\"></head><body><main class=\"m\"></main></body></html>",
        );
        project.write("src/scss/index.scss", ".m { color: red; }\n.x { color: blue; }");

        let ctx = project.ctx_with(BuildMode::PRODUCTION, "[image]\noptimize = false");
        let graph = TaskGraph::new(&ctx.config.tasks);
        let report = run_names(&graph, &["build".into()], &ctx).unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert!(!project.exists("dist/stale.txt"));
        let html = project.read("dist/index.html");
        assert!(html.contains("<style data-runnel-critical>.m{color:red}</style>"), "{html}");
    }
}
