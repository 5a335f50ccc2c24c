//! `runnel tasks`: print the task graph.

use std::fmt::Write;

use anyhow::Result;

use crate::config::ProjectConfig;
use crate::graph::TaskGraph;
use crate::task::TaskId;
use crate::watch::WatchTable;

/// Validate the graph and print tasks, composites and watch bindings.
pub fn print_tasks(config: &ProjectConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &ProjectConfig) -> Result<String> {
    let graph = TaskGraph::new(&config.tasks);
    graph.validate()?;
    let table = WatchTable::default_for(config)?;

    let mut out = String::new();
    writeln!(out, "Tasks:")?;
    for id in TaskId::ALL {
        writeln!(out, "  {:<10} {}", id.name(), id.description())?;
    }

    writeln!(out, "\nComposites:")?;
    for (name, node) in graph.composites() {
        writeln!(out, "  {name:<10} {node}")?;
    }

    writeln!(out, "\nWatch:")?;
    for binding in table.bindings() {
        writeln!(out, "  {:<40} {}", binding.pattern, binding.task)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use std::path::Path;

    #[test]
    fn test_render_lists_everything() {
        let config = test_config_at(
            Path::new("/site"),
            "[tasks]\nimages = { parallel = [\"img\", \"webp\"] }",
        );
        let out = render(&config).unwrap();
        assert!(out.contains("critical"));
        assert!(out.contains("build      series(clear, base, critical)"));
        assert!(out.contains("images     parallel(img, webp)"));
        assert!(out.contains("src/js/**/*.js"));
    }

    #[test]
    fn test_render_rejects_cycle() {
        let config = test_config_at(
            Path::new("/site"),
            "[tasks]\na = { series = [\"b\"] }\nb = { series = [\"a\"] }",
        );
        assert!(render(&config).is_err());
    }
}
