//! `js`: bundle libraries and scripts into one minified file.
//!
//! Configured libraries come first (in configuration order, skipped when
//! absent), then `src/js/**/*.js` sorted by path. Each file is minified
//! on its own and the results are concatenated.

use std::fs;

use anyhow::Result;
use rayon::prelude::*;

use super::output::write_if_changed;
use super::{SourceFile, SourceSet, TaskContext, TaskId, TaskReport, slash_path};
use crate::debug;
use crate::minify::{Minified, ScriptBundle, minify_js};

pub const PATTERN: &str = "js/**/*.js";

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Js);
    let files = bundle_inputs(ctx)?;
    if files.is_empty() {
        return Ok(report);
    }

    let source_maps = ctx.mode.source_maps;
    let parts: Vec<_> = files
        .par_iter()
        .map(|file| {
            let name = slash_path(ctx.config.root_relative(&file.path));
            let minified = fs::read_to_string(&file.path)
                .map_err(anyhow::Error::from)
                .and_then(|src| Ok(minify_js(&name, &src, source_maps)?));
            (file, minified)
        })
        .collect();

    let mut bundle = ScriptBundle::new(source_maps);
    for (file, part) in parts {
        match part {
            Ok(part) => bundle.push(part)?,
            Err(err) => report.fail(ctx.config.root_relative(&file.path), format!("{err:#}")),
        }
    }
    if bundle.is_empty() {
        return Ok(report);
    }

    let layout = ctx.layout();
    let bundle_name = &ctx.config.script.bundle;
    let Minified { mut code, map } = bundle.finish()?;

    if let Some(map) = map {
        let map_name = format!("{bundle_name}.map");
        let map_dest = layout.maps().join(&map_name);
        code.push_str(&format!("\n//# sourceMappingURL=../maps/{map_name}"));
        let changed = write_if_changed(&map_dest, map)?;
        report.output(map_dest, changed);
    }

    let dest = layout.js().join(bundle_name);
    let changed = write_if_changed(&dest, code)?;
    report.output(dest, changed);

    Ok(report)
}

/// Libraries first, then scripts.
fn bundle_inputs(ctx: &TaskContext) -> Result<Vec<SourceFile>> {
    let src = ctx.src();
    let mut files: Vec<_> = ctx
        .config
        .script
        .libs
        .iter()
        .filter_map(|lib| {
            let path = src.join(lib);
            if path.is_file() {
                Some(SourceFile {
                    path,
                    rel: lib.clone(),
                })
            } else {
                debug!("js"; "library {} not found, skipped", lib.display());
                None
            }
        })
        .collect();

    let scripts: Vec<_> = SourceSet::new(src, &[PATTERN])?
        .files()?
        .into_iter()
        .filter(|s| !files.contains(s))
        .collect();
    files.extend(scripts);
    Ok(files)
}
