//! Minification for HTML, CSS and JavaScript.
//!
//! Uses oxc for JavaScript, lightningcss for CSS and minify_html for HTML.
//! CSS and JavaScript can emit source maps (JSON, version 3).

mod css;
mod html;
mod js;

pub use css::minify_css;
pub use html::minify_html;
pub use js::{ScriptBundle, minify_js};

use thiserror::Error;

/// Minified output with an optional source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minified {
    pub code: String,
    /// Source map as JSON, present only when requested.
    pub map: Option<String>,
}

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("{name}: {message}")]
    Js { name: String, message: String },

    #[error("{name}: {message}")]
    Css { name: String, message: String },

    #[error("source map: {0}")]
    SourceMap(String),
}
