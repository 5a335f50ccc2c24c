//! runnel - asset build runner for static sites.

mod cli;
mod config;
mod core;
mod embed;
mod graph;
mod logger;
mod minify;
mod reload;
mod serve;
mod task;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;
use core::BuildMode;

fn main() -> Result<()> {
    // Before anything blocks, so Ctrl+C always exits
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(ProjectConfig::load(&cli)?);

    match &cli.command {
        None => cli::run::develop(config).map(|_| ()),
        Some(Commands::Build) => cli::run::build(config).map(|_| ()),
        Some(Commands::Run { tasks, dev }) => {
            let mode = if *dev {
                BuildMode::DEVELOPMENT
            } else {
                BuildMode::PRODUCTION
            };
            cli::run::run_tasks(config, tasks, mode).map(|_| ())
        }
        Some(Commands::Serve) => cli::run::serve(config).map(|_| ()),
        Some(Commands::Tasks) => cli::tasks::print_tasks(&config),
    }
}
