//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StyleStrategy;

/// Asset build runner for static sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "runnel.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override `[style] strategy`
    #[arg(short, long, global = true, value_enum)]
    pub style: Option<StyleStrategy>,

    /// Without a subcommand: development build, then serve and watch
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Production build: clear, base, critical
    #[command(visible_alias = "b")]
    Build,

    /// Run named tasks or composites in order
    #[command(visible_alias = "r")]
    Run {
        /// Task or composite names (e.g. `style js`, `base`)
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,

        /// Development mode: write source maps, skip image optimization
        #[arg(short, long)]
        dev: bool,
    },

    /// Serve the output with live reload, without an initial build
    #[command(visible_alias = "s")]
    Serve,

    /// Print the task graph
    #[command(visible_alias = "t")]
    Tasks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["runnel"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("runnel.toml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_tasks() {
        let cli = Cli::try_parse_from(["runnel", "run", "style", "js", "--dev"]).unwrap();
        match cli.command {
            Some(Commands::Run { tasks, dev }) => {
                assert_eq!(tasks, ["style", "js"]);
                assert!(dev);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_task() {
        assert!(Cli::try_parse_from(["runnel", "run"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["runnel", "build", "--style", "css", "-C", "site.toml"]).unwrap();
        assert_eq!(cli.style, Some(StyleStrategy::Css));
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert!(matches!(cli.command, Some(Commands::Build)));
    }
}
