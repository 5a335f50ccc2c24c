//! `[style]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [style]
//! strategy = "scss"   # scss: compile src/scss/**/*.scss
//!                     # css:  bundle src/css/**/*.css (inlines @import)
//! ```

use serde::{Deserialize, Serialize};

/// How the `style` task produces stylesheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StyleStrategy {
    /// Compile Sass sources.
    #[default]
    Scss,
    /// Concatenate plain CSS, inlining local `@import`s.
    Css,
}

impl StyleStrategy {
    /// Source glob, relative to the source root.
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Scss => "scss/**/*.scss",
            Self::Css => "css/**/*.css",
        }
    }

    /// Directory below the source root the strategy reads from.
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Scss => "scss",
            Self::Css => "css",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub strategy: StyleStrategy,
}
