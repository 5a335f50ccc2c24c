//! `[critical]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [critical]
//! enable = true
//! css = ["css/index.css"]   # Stylesheets to extract from, relative to dist
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalConfig {
    /// Run the critical-style pass at the end of `build`.
    pub enable: bool,
    pub css: Vec<PathBuf>,
}

impl Default for CriticalConfig {
    fn default() -> Self {
        Self {
            enable: true,
            css: vec!["css/index.css".into()],
        }
    }
}

impl CriticalConfig {
    pub const CSS: FieldPath = FieldPath::new("critical.css");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for path in &self.css {
            if path.is_absolute() {
                diag.error(
                    Self::CSS,
                    format!("`{}` must be relative to the output root", path.display()),
                );
            }
        }
    }
}
