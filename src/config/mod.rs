//! Project configuration management for `runnel.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! ├── util.rs        # Config file discovery
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! The configuration is loaded once and shared as `Arc<ProjectConfig>`.
//! It never changes while a task graph runs.

pub mod section;
pub mod types;
mod util;

pub use section::{
    AvifConfig, CompositeConfig, CriticalConfig, ImageConfig, PathsConfig, ScriptConfig,
    ServeConfig, StyleConfig, StyleStrategy, TasksConfig, WebpConfig, WebpEncoder,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{cli::Cli, debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

/// Root configuration structure representing runnel.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file, empty when running on defaults
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file, or cwd
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub critical: CriticalConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
}

impl ProjectConfig {
    /// Load configuration for the CLI invocation.
    ///
    /// Searches upward from cwd for the config file. Without one, the
    /// defaults apply with cwd as project root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        if let Some(strategy) = cli.style {
            config.style.strategy = strategy;
        }
        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Resolve relative paths against the project root.
    pub fn finalize(&mut self) {
        let root = self.root.clone();
        self.paths.normalize(&root);
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            log!("warning"; "unknown fields in {} ignored: {}", name, ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Validate every section, printing warnings and failing on errors.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.paths.validate(&mut diag);
        self.script.validate(&mut diag);
        self.image.validate(&mut diag);
        self.critical.validate(&mut diag);
        self.serve.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Source root.
    pub fn src(&self) -> &Path {
        &self.paths.src
    }

    /// Output root.
    pub fn dist(&self) -> &Path {
        &self.paths.dist
    }

    /// Path relative to the project root, for display and watch matching.
    pub fn root_relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Parse a config snippet for tests, panicking on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Build a finalized config rooted at `root`, for tests.
#[cfg(test)]
pub fn test_config_at(root: &Path, content: &str) -> ProjectConfig {
    let mut config = test_parse_config(content);
    config.root = root.to_path_buf();
    config.finalize();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.paths.src, PathBuf::from("src"));
        assert_eq!(config.style.strategy, StyleStrategy::Scss);
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            ProjectConfig::parse_with_ignored("[paths]\nsrc = \"web\"\nbogus = 1").unwrap();
        assert_eq!(ignored, vec!["paths.bogus".to_string()]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ProjectConfig::parse_with_ignored("[paths").is_err());
    }

    #[test]
    fn test_finalize_resolves_paths() {
        let config = test_config_at(Path::new("/site"), "[paths]\ndist = \"public\"");
        assert_eq!(config.src(), Path::new("/site/src"));
        assert_eq!(config.dist(), Path::new("/site/public"));
        assert_eq!(
            config.root_relative(Path::new("/site/src/js/a.js")),
            Path::new("src/js/a.js")
        );
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let config = test_config_at(Path::new("/site"), "[paths]\ndist = \".\"");
        assert!(config.validate().is_err());
    }
}
