//! Graph runs behind `build`, `run`, `serve` and the default command.

use std::sync::Arc;

use anyhow::Result;

use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::graph::{BUILD, DEFAULT, RunReport, TaskGraph, run_names};
use crate::log;
use crate::task::{TaskContext, TaskId};

/// Run `names` in order under `mode`, failing when any task failed.
pub fn run_tasks(config: Arc<ProjectConfig>, names: &[String], mode: BuildMode) -> Result<RunReport> {
    let graph = TaskGraph::new(&config.tasks);
    let ctx = TaskContext::new(config, mode);

    log!("run"; "{} ({})", names.join(", "), mode);
    let report = run_names(&graph, names, &ctx)?;

    if report.is_success() {
        log!("done"; "{}", report.summary());
    } else {
        log!("error"; "{}", report.summary());
    }
    report.into_result()
}

/// Production build: `clear`, `base`, then `critical`.
pub fn build(config: Arc<ProjectConfig>) -> Result<RunReport> {
    run_tasks(config, &[BUILD.to_string()], BuildMode::PRODUCTION)
}

/// Development `base`, then the server.
pub fn develop(config: Arc<ProjectConfig>) -> Result<RunReport> {
    run_tasks(config, &[DEFAULT.to_string()], BuildMode::DEVELOPMENT)
}

/// The server alone, over whatever is already in the output root.
pub fn serve(config: Arc<ProjectConfig>) -> Result<RunReport> {
    run_tasks(config, &[TaskId::Server.name().to_string()], BuildMode::DEVELOPMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::Project;

    fn config(project: &Project, toml: &str) -> Arc<ProjectConfig> {
        project.ctx_with(BuildMode::PRODUCTION, toml).config
    }

    #[test]
    fn test_build_produces_output() {
        let project = Project::new();
        project.write("src/index.html", "<html><head></head><body>  <p>hi</p>  </body></html>");
        project.write("dist/stale.txt", "old");

        let report = build(config(&project, "")).unwrap();
        assert!(report.is_success());
        assert!(project.exists("dist/index.html"));
        assert!(!project.exists("dist/stale.txt"));
        assert!(!project.exists("dist/maps"));
    }

    fn snapshot(project: &Project) -> Vec<(std::path::PathBuf, Vec<u8>)> {
        let dist = project.dir.path().join("dist");
        let mut files: Vec<_> = jwalk::WalkDir::new(&dist)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let path = e.path();
                let bytes = std::fs::read(&path).unwrap();
                (path.strip_prefix(&dist).unwrap().to_path_buf(), bytes)
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_build_is_idempotent() {
        let project = Project::new();
        project.write(
            "src/index.html",
            r#"<html><head><link rel="stylesheet" href="css/index.css"></head><body><p class="lead">hi</p></body></html>"#,
        );
        project.write("src/scss/_vars.scss", "$c: #333;");
        project.write("src/scss/index.scss", "@use 'vars';\n.lead { color: vars.$c; }\n.unused { margin: 0; }");
        project.write("src/js/a.js", "function greet(name) { return 'hi ' + name; }\nwindow.greet = greet;");
        project.write("src/fonts/a.woff2", [7u8; 8]);

        build(config(&project, "")).unwrap();
        let first = snapshot(&project);
        build(config(&project, "")).unwrap();
        let second = snapshot(&project);

        assert!(first.iter().any(|(p, _)| p.ends_with("css/index.css")));
        assert!(first.iter().any(|(p, _)| p.ends_with("js/index.min.js")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_unknown_task() {
        let project = Project::new();
        let err = run_tasks(config(&project, ""), &["bogus".into()], BuildMode::DEVELOPMENT)
            .unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure_is_error() {
        let project = Project::new();
        project.write("src/img/a.png", b"not really a png");
        let toml = "[image]\npng = [\"sh\", \"-c\", \"exit 1\"]";

        let result = run_tasks(config(&project, toml), &["img".into()], BuildMode::PRODUCTION);
        assert!(result.unwrap_err().to_string().contains("img"));
    }

    #[test]
    fn test_run_custom_composite() {
        let project = Project::new();
        project.write("src/fonts/a.woff2", [0u8; 4]);
        let toml = "[tasks]\nfonts = { series = [\"clear\", \"copy\"] }";

        run_tasks(config(&project, toml), &["fonts".into()], BuildMode::DEVELOPMENT).unwrap();
        assert!(project.exists("dist/fonts/a.woff2"));
    }
}
