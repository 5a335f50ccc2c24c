//! JavaScript minification (oxc) and bundle concatenation.

use std::path::PathBuf;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use parcel_sourcemap::SourceMap;

use super::{Minified, MinifyError};

/// Minify one classic script.
///
/// Scripts share the page's global scope: top-level names are neither
/// mangled nor dropped when unused. `name` is recorded as the source in
/// the map.
pub fn minify_js(name: &str, source: &str, source_map: bool) -> Result<Minified, MinifyError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(MinifyError::Js {
            name: name.to_string(),
            message,
        });
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let ret = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: source_map.then(|| PathBuf::from(name)),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    Ok(Minified {
        code: ret.code,
        map: ret.map.map(|map| map.to_json_string()),
    })
}

/// Concatenation of minified scripts into one bundle.
///
/// Each part lands on its own line; part maps are merged at the right
/// line offset so the bundle map points back to every original file.
pub struct ScriptBundle {
    code: String,
    map: Option<SourceMap>,
}

impl ScriptBundle {
    pub fn new(source_map: bool) -> Self {
        Self {
            code: String::new(),
            map: source_map.then(|| SourceMap::new("/")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn push(&mut self, part: Minified) -> Result<(), MinifyError> {
        if !self.code.is_empty() && !self.code.ends_with('\n') {
            self.code.push('\n');
        }
        let line_offset = self.code.matches('\n').count() as i64;

        if let (Some(bundle), Some(json)) = (self.map.as_mut(), part.map.as_deref()) {
            let mut map = SourceMap::from_json("/", json)
                .map_err(|e| MinifyError::SourceMap(format!("{e:?}")))?;
            bundle
                .add_sourcemap(&mut map, line_offset)
                .map_err(|e| MinifyError::SourceMap(format!("{e:?}")))?;
        }

        self.code.push_str(part.code.trim_end());
        Ok(())
    }

    pub fn finish(self) -> Result<Minified, MinifyError> {
        let map = match self.map {
            Some(mut map) => Some(
                map.to_json(None)
                    .map_err(|e| MinifyError::SourceMap(format!("{e:?}")))?,
            ),
            None => None,
        };
        Ok(Minified {
            code: self.code,
            map,
        })
    }
}
