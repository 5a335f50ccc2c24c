//! `copy`: byte copy of `src/fonts/**` into `dist/fonts`.

use std::fs;

use anyhow::Result;

use super::output::write_if_changed;
use super::{FileError, SourceSet, TaskContext, TaskId, TaskReport, process_files};

pub const PATTERN: &str = "fonts/**/*";

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Copy);
    let files = SourceSet::new(ctx.src(), &[PATTERN])?.files()?;
    let layout = ctx.layout();

    process_files(ctx, &mut report, &files, |file| {
        let content = fs::read(&file.path).map_err(FileError::skip)?;
        let dest = layout.root().join(&file.rel);
        let changed = write_if_changed(&dest, content)?;
        Ok(vec![(dest, changed)])
    })?;

    Ok(report)
}
