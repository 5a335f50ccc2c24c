//! `img`: copy images into `dist/img`, optimized in production.
//!
//! SVG is optimized in-process with usvg. PNG, JPEG and GIF are copied and
//! then rewritten in place by the configured optimizer command; a failing
//! command fails the task.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::output::write_if_changed;
use super::{FileError, SourceSet, TaskContext, TaskId, TaskReport, process_files};
use crate::utils::exec::Cmd;

pub const PATTERN: &str = "img/**/*.{jpg,jpeg,png,gif,svg}";

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Img);
    let files = SourceSet::new(ctx.src(), &[PATTERN])?.files()?;
    let layout = ctx.layout();
    let image = &ctx.config.image;
    let optimize = ctx.mode.optimize_images && image.optimize;

    process_files(ctx, &mut report, &files, |file| {
        let content = fs::read(&file.path).map_err(FileError::skip)?;
        let dest = layout.root().join(&file.rel);
        let ext = extension(&file.path);

        if !optimize {
            let changed = write_if_changed(&dest, &content)?;
            return Ok(vec![(dest, changed)]);
        }

        if ext == "svg" {
            let optimized = optimize_svg(&content).map_err(FileError::Skip)?;
            let changed = write_if_changed(&dest, optimized)?;
            return Ok(vec![(dest, changed)]);
        }

        let changed = write_if_changed(&dest, &content)?;
        match image.optimizer_for(&ext) {
            Some(cmd) => {
                run_optimizer(cmd, &dest)?;
                Ok(vec![(dest, true)])
            }
            None => Ok(vec![(dest, changed)]),
        }
    })?;

    Ok(report)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Run an optimizer command on `dest`, in place.
fn run_optimizer(cmd: &[String], dest: &Path) -> Result<()> {
    Cmd::from_slice(cmd)
        .arg(dest)
        .run()
        .map(|_| ())
        .with_context(|| format!("optimizer `{}` failed", cmd.join(" ")))
}

/// Minify SVG markup, keeping the original when it is already smaller.
///
/// Text is left alone: without fonts usvg would drop `<text>` elements.
fn optimize_svg(content: &[u8]) -> Result<Vec<u8>> {
    if content.windows(5).any(|w| w == b"<text") {
        return Ok(content.to_vec());
    }

    let tree = usvg::Tree::from_data(content, &usvg::Options::default())
        .context("Failed to parse SVG")?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    let optimized = tree.to_string(&write_options).into_bytes();

    Ok(if optimized.len() < content.len() {
        optimized
    } else {
        content.to_vec()
    })
}
