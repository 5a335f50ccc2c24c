//! `[script]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [script]
//! libs = ["libs/jquery-3.7.0.min.js"]   # Prepended in order, relative to src
//! bundle = "index.min.js"               # Written to dist/js/
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Library files bundled before `js/**/*.js`. Missing files are skipped.
    pub libs: Vec<PathBuf>,
    /// Bundle file name.
    pub bundle: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            libs: vec!["libs/jquery-3.7.0.min.js".into()],
            bundle: "index.min.js".into(),
        }
    }
}

impl ScriptConfig {
    pub const BUNDLE: FieldPath = FieldPath::new("script.bundle");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let name = self.bundle.as_str();
        if name.is_empty() || name.contains(['/', '\\']) {
            diag.error(
                Self::BUNDLE,
                format!("`{name}` is not a plain file name"),
            );
        } else if !name.ends_with(".js") {
            diag.warn(Self::BUNDLE, format!("`{name}` does not end with .js"));
        }
    }
}
