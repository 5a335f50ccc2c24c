//! CSS minification (lightningcss).

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use parcel_sourcemap::SourceMap;

use super::{Minified, MinifyError};

/// Minify a stylesheet, dropping every comment including `/*! ... */`.
///
/// `name` is recorded as the source in the map.
pub fn minify_css(name: &str, source: &str, source_map: bool) -> Result<Minified, MinifyError> {
    let css_error = |message: String| MinifyError::Css {
        name: name.to_string(),
        message,
    };

    let options = ParserOptions {
        filename: name.to_string(),
        ..ParserOptions::default()
    };
    let mut stylesheet =
        StyleSheet::parse(source, options).map_err(|e| css_error(e.to_string()))?;
    stylesheet.license_comments.clear();
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| css_error(e.to_string()))?;

    let mut map = if source_map {
        let mut map = SourceMap::new("/");
        let index = map.add_source(name);
        map.set_source_content(index as usize, source)
            .map_err(|e| MinifyError::SourceMap(format!("{e:?}")))?;
        Some(map)
    } else {
        None
    };

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let map = match map {
        Some(mut map) => Some(
            map.to_json(None)
                .map_err(|e| MinifyError::SourceMap(format!("{e:?}")))?,
        ),
        None => None,
    };

    Ok(Minified {
        code: result.code,
        map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css_strips_comments() {
        let src = "/*! license */\n/* note */\nbody {\n  color: #ff0000;\n  margin: 0px;\n}\n";
        let out = minify_css("index.css", src, false).unwrap();
        assert!(!out.code.contains("license"));
        assert!(!out.code.contains("note"));
        assert!(out.code.contains("body{"));
        assert!(out.map.is_none());
    }

    #[test]
    fn test_minify_css_source_map() {
        let out = minify_css("css/index.css", ".a { color: red; }\n.b { color: blue; }", true).unwrap();
        let map = out.map.unwrap();
        assert!(map.contains("index.css"));
        assert!(map.contains("\"mappings\""));
    }

    #[test]
    fn test_minify_css_invalid_selector() {
        let err = minify_css("bad.css", "..bad { color: red; }", false).unwrap_err();
        assert!(err.to_string().starts_with("bad.css:"));
    }
}
