//! `html`: minify top-level pages into the output root.

use std::fs;

use anyhow::Result;

use super::output::write_if_changed;
use super::{FileError, SourceSet, TaskContext, TaskId, TaskReport, process_files};
use crate::minify::minify_html;

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Html);
    let files = SourceSet::new(ctx.src(), &["*.html"])?.files()?;
    let layout = ctx.layout();

    process_files(ctx, &mut report, &files, |file| {
        let content = fs::read_to_string(&file.path).map_err(FileError::skip)?;
        let dest = layout.root().join(&file.rel);
        let changed = write_if_changed(&dest, minify_html(&content))?;
        Ok(vec![(dest, changed)])
    })?;

    Ok(report)
}
