//! `clear`: remove every entry below the output root.

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result};

use super::{TaskContext, TaskId, TaskReport};

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let report = TaskReport::new(TaskId::Clear);
    let root = ctx.config.dist();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", root.display())),
    };

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read {}", root.display()))?
            .path();
        let removed = if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    }

    Ok(report)
}
