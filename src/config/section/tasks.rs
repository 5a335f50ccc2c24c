//! `[tasks]` section: user-defined composite tasks.
//!
//! # Example
//!
//! ```toml
//! [tasks]
//! images = { parallel = ["img", "webp", "avif"] }
//! fresh = { series = ["clear", "images"] }
//! ```
//!
//! Members may name built-in tasks, built-in composites (`base`, `build`)
//! or other entries of this table. References are checked before any task
//! runs; see `graph::TaskGraph::validate`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompositeConfig {
    Parallel { parallel: Vec<String> },
    Series { series: Vec<String> },
}

impl CompositeConfig {
    pub fn members(&self) -> &[String] {
        match self {
            Self::Parallel { parallel } => parallel,
            Self::Series { series } => series,
        }
    }
}

pub type TasksConfig = BTreeMap<String, CompositeConfig>;
