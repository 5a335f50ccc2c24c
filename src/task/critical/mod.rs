//! `critical`: inline the style rules each built page uses.
//!
//! Runs over `dist/*.html` after the other tasks. For every page the rules
//! of the configured stylesheets that apply to its markup go into a
//! `<style>` block in `<head>`, and the `<link>` to the full stylesheet is
//! switched to a non-blocking load with a `<noscript>` fallback.

mod css;
mod page;

use std::fs;

use anyhow::Result;

use self::css::extract_critical;
use self::page::{MARKER, UsedSelectors, inject};
use super::output::write_if_changed;
use super::{FileError, SourceSet, TaskContext, TaskId, TaskReport, process_files, slash_path};
use crate::debug;

struct Stylesheet {
    href: String,
    css: String,
}

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Critical);
    let config = &ctx.config.critical;
    if !config.enable {
        return Ok(report);
    }

    let layout = ctx.layout();
    let sheets: Vec<_> = config
        .css
        .iter()
        .filter_map(|rel| {
            let path = layout.root().join(rel);
            match fs::read_to_string(&path) {
                Ok(css) => Some(Stylesheet {
                    href: slash_path(rel),
                    css,
                }),
                Err(_) => {
                    debug!("critical"; "{} not built, skipped", path.display());
                    None
                }
            }
        })
        .collect();
    if sheets.is_empty() {
        return Ok(report);
    }
    let deferred: Vec<_> = sheets.iter().map(|s| s.href.clone()).collect();

    let pages = SourceSet::new(layout.root(), &["*.html"])?.files()?;
    process_files(ctx, &mut report, &pages, |file| {
        let html = fs::read_to_string(&file.path).map_err(FileError::skip)?;
        if html.contains(MARKER) {
            return Ok(vec![(file.path.clone(), false)]);
        }

        let used = UsedSelectors::from_html(&html);
        let mut critical = String::new();
        for sheet in &sheets {
            let rules = extract_critical(&sheet.css, &used)
                .map_err(|e| FileError::Skip(e.context(sheet.href.clone())))?;
            critical.push_str(&rules);
        }

        let Some(rewritten) = inject(&html, &critical, &deferred) else {
            debug!("critical"; "{} has no </head>, skipped", file.rel.display());
            return Ok(vec![(file.path.clone(), false)]);
        };
        let changed = write_if_changed(&file.path, rewritten)?;
        Ok(vec![(file.path.clone(), changed)])
    })?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::task::testing::Project;

    const PAGE: &str = r#"<html><head><link rel="stylesheet" href="css/index.css"></head><body><div class="hero">x</div></body></html>"#;

    #[test]
    fn test_critical_inlines_used_rules() {
        let project = Project::new();
        project.write("dist/index.html", PAGE);
        project.write("dist/css/index.css", ".hero{color:red}.footer{color:blue}");

        let report = run(&project.ctx(BuildMode::PRODUCTION)).unwrap();
        assert_eq!(report.written.len(), 1);

        let html = project.read("dist/index.html");
        assert!(html.contains("<style data-runnel-critical>.hero{color:red}</style>"));
        assert!(!html.contains(".footer"));
        assert!(html.contains("media=\"print\""));
    }

    #[test]
    fn test_critical_is_idempotent() {
        let project = Project::new();
        project.write("dist/index.html", PAGE);
        project.write("dist/css/index.css", ".hero{color:red}");
        let ctx = project.ctx(BuildMode::PRODUCTION);

        run(&ctx).unwrap();
        let first = project.read("dist/index.html");
        let report = run(&ctx).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(project.read("dist/index.html"), first);
    }

    #[test]
    fn test_critical_keeps_container_rules() {
        let project = Project::new();
        project.write("dist/index.html", PAGE);
        project.write(
            "dist/css/index.css",
            "@container (min-width:400px){.hero{color:red}.footer{color:blue}}",
        );

        run(&project.ctx(BuildMode::PRODUCTION)).unwrap();
        let html = project.read("dist/index.html");
        assert!(html.contains("<style data-runnel-critical>@container"), "{html}");
        assert!(html.contains(".hero{color:red}"), "{html}");
        assert!(!html.contains(".footer"), "{html}");
    }

    #[test]
    fn test_critical_disabled_or_unbuilt() {
        let project = Project::new();
        project.write("dist/index.html", PAGE);

        let report = run(&project.ctx(BuildMode::PRODUCTION)).unwrap();
        assert_eq!(report.outputs(), 0);

        project.write("dist/css/index.css", ".hero{color:red}");
        let ctx = project.ctx_with(BuildMode::PRODUCTION, "[critical]\nenable = false");
        run(&ctx).unwrap();
        assert_eq!(project.read("dist/index.html"), PAGE);
    }
}
