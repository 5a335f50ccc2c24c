//! Command-line interface module.

mod args;
pub mod run;
pub mod tasks;

pub use args::{Cli, Commands};
