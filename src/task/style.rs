//! `style`: compile and minify stylesheets into `dist/css`.
//!
//! - `scss`: `src/scss/**/*.scss` through grass; `_partial.scss` files are
//!   only reachable through `@use`/`@import` and never emitted.
//! - `css`: `src/css/**/*.css` with local `@import`s inlined.
//!
//! Development builds write `dist/maps/<rel>.css.map` and point to it
//! with a `sourceMappingURL` comment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;

use super::output::write_if_changed;
use super::{
    FileError, Layout, SourceFile, SourceSet, TaskContext, TaskId, TaskReport, process_files,
    slash_path,
};
use crate::config::StyleStrategy;
use crate::minify::minify_css;

/// `@import "x.css";` or `@import url(x.css);` with optional quotes.
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import[ \t]+(?:url\([ \t]*)?["']?([^"')]+?)["']?[ \t]*\)?[ \t]*;"#).unwrap()
});

pub fn run(ctx: &TaskContext) -> Result<TaskReport> {
    let mut report = TaskReport::new(TaskId::Style);
    let strategy = ctx.config.style.strategy;
    let files: Vec<_> = SourceSet::new(ctx.src(), &[strategy.pattern()])?
        .files()?
        .into_iter()
        .filter(|f| !is_partial(&f.path))
        .collect();
    let layout = ctx.layout();

    process_files(ctx, &mut report, &files, |file| {
        let css = match strategy {
            StyleStrategy::Scss => compile_scss(file, ctx.src()),
            StyleStrategy::Css => inline_imports(&file.path, &mut Vec::new()),
        }
        .map_err(FileError::Skip)?;

        let rel = output_rel(file, strategy);
        let name = source_name(ctx, file, strategy);
        let minified = minify_css(&name, &css, ctx.mode.source_maps).map_err(FileError::skip)?;

        write_outputs(&layout, &rel, minified.code, minified.map)
    })?;

    Ok(report)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn compile_scss(file: &SourceFile, src: &Path) -> Result<String> {
    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_path(src.join(StyleStrategy::Scss.dir()));
    grass::from_path(&file.path, &options).map_err(|e| anyhow!("{e}"))
}

/// Inline local `@import`s of `.css` files, depth first.
///
/// Remote imports (`http:`, `https:`, `//`) stay as written. `stack` holds
/// the files currently being expanded, so an import cycle is an error.
fn inline_imports(path: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("cannot read {}", path.display()))?;
    if stack.contains(&canonical) {
        bail!("import cycle through {}", path.display());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let dir = path.parent().unwrap_or(Path::new("."));

    stack.push(canonical);
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in IMPORT_RE.captures_iter(&content) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let target = target.as_str().trim();
        if is_remote(target) || !target.ends_with(".css") {
            continue;
        }
        out.push_str(&content[last..whole.start()]);
        out.push_str(&inline_imports(&dir.join(target), stack)?);
        last = whole.end();
    }
    out.push_str(&content[last..]);
    stack.pop();

    Ok(out)
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http:") || target.starts_with("https:") || target.starts_with("//")
}

/// `scss/pages/home.scss` -> `pages/home.css`
fn output_rel(file: &SourceFile, strategy: StyleStrategy) -> PathBuf {
    let mut rel = file
        .rel
        .strip_prefix(strategy.dir())
        .unwrap_or(&file.rel)
        .to_path_buf();
    rel.set_extension("css");
    rel
}

/// Name recorded in the source map, relative to the project root.
///
/// Maps point into the CSS handed to the minifier, so for SCSS that is
/// grass output, which the map embeds under a `(compiled)` name.
fn source_name(ctx: &TaskContext, file: &SourceFile, strategy: StyleStrategy) -> String {
    let name = slash_path(ctx.config.root_relative(&file.path));
    match strategy {
        StyleStrategy::Scss => format!("{name} (compiled)"),
        StyleStrategy::Css => name,
    }
}

/// Write the stylesheet and, when present, its map.
fn write_outputs(
    layout: &Layout,
    rel: &Path,
    mut code: String,
    map: Option<String>,
) -> Result<Vec<(PathBuf, bool)>, FileError> {
    let dest = layout.css().join(rel);
    let mut outputs = Vec::with_capacity(2);

    if let Some(map) = map {
        let map_rel = PathBuf::from(format!("{}.map", slash_path(rel)));
        let map_dest = layout.maps().join(&map_rel);
        code.push_str(&format!(
            "\n/*# sourceMappingURL={} */",
            map_url(rel, &map_rel)
        ));
        let changed = write_if_changed(&map_dest, map)?;
        outputs.push((map_dest, changed));
    }

    let changed = write_if_changed(&dest, code)?;
    outputs.insert(0, (dest, changed));
    Ok(outputs)
}

/// Relative URL from `dist/css/<rel>` to `dist/maps/<map_rel>`.
fn map_url(rel: &Path, map_rel: &Path) -> String {
    let depth = rel.components().count();
    format!("{}maps/{}", "../".repeat(depth), slash_path(map_rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::task::testing::Project;

    #[test]
    fn test_scss_compiled_and_minified() {
        let project = Project::new();
        project.write("src/scss/_vars.scss", "$accent: #336699;");
        project.write(
            "src/scss/index.scss",
            "@use 'vars';\n/* comment */\n.btn {\n  color: vars.$accent;\n  &:hover { color: red; }\n}\n",
        );

        let report = run(&project.ctx(BuildMode::PRODUCTION)).unwrap();
        assert!(report.failures.is_empty());

        let css = project.read("dist/css/index.css");
        assert!(css.contains(".btn{color:#369}"), "{css}");
        assert!(css.contains(".btn:hover"));
        assert!(!css.contains("comment"));
        assert!(!css.contains("sourceMappingURL"));
        assert!(!project.exists("dist/css/_vars.css"));
        assert!(!project.exists("dist/maps"));
    }

    #[test]
    fn test_scss_dev_writes_map() {
        let project = Project::new();
        project.write("src/scss/pages/home.scss", ".home { margin: 0; }");

        let report = run(&project.ctx(BuildMode::DEVELOPMENT)).unwrap();
        assert_eq!(report.written.len(), 2);

        let css = project.read("dist/css/pages/home.css");
        assert!(css.ends_with("/*# sourceMappingURL=../../maps/pages/home.css.map */"), "{css}");
        let map = project.read("dist/maps/pages/home.css.map");
        assert!(map.contains("\"src/scss/pages/home.scss (compiled)\""), "{map}");
        // The embedded source is grass output, not the scss text
        assert!(map.contains(".home {\\n  margin: 0;\\n}"), "{map}");
    }

    #[test]
    fn test_scss_error_is_recorded() {
        let project = Project::new();
        project.write("src/scss/broken.scss", ".a { color: $missing; }");
        project.write("src/scss/ok.scss", ".b { color: red; }");

        let report = run(&project.ctx(BuildMode::PRODUCTION)).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("broken.scss"));
        assert!(project.exists("dist/css/ok.css"));
        assert!(!project.exists("dist/css/broken.css"));
    }

    #[test]
    fn test_plain_css_inlines_imports() {
        let project = Project::new();
        project.write("src/css/base/reset.css", "html { margin: 0; }");
        project.write(
            "src/css/index.css",
            "@import url(\"https://fonts.example.com/x.css\");\n@import \"base/reset.css\";\n.a { color: blue; }\n",
        );

        let ctx = project.ctx_with(BuildMode::PRODUCTION, "[style]\nstrategy = \"css\"");
        run(&ctx).unwrap();

        let css = project.read("dist/css/index.css");
        assert!(css.contains("fonts.example.com"));
        assert!(css.contains("html{margin:0}"), "{css}");
        assert!(css.contains(".a{color:#00f}"), "{css}");
        assert!(project.exists("dist/css/base/reset.css"));
    }

    #[test]
    fn test_plain_css_import_cycle() {
        let project = Project::new();
        project.write("src/css/a.css", "@import \"b.css\";\n.a{}");
        project.write("src/css/b.css", "@import \"a.css\";\n.b{}");

        let ctx = project.ctx_with(BuildMode::PRODUCTION, "[style]\nstrategy = \"css\"");
        let report = run(&ctx).unwrap();
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].message.contains("cycle"));
    }

    #[test]
    fn test_map_url() {
        assert_eq!(
            map_url(Path::new("index.css"), Path::new("index.css.map")),
            "../maps/index.css.map"
        );
    }
}
