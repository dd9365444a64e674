//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `analyze`: Critical path analysis of the active tasks
//! - `simulate`: Ripple effect of delaying one task
//! - `scan`: One slippage scan followed by a recalculation
//! - `latest`: Show the cached impact snapshot
//! - `watch`: Keep the snapshot current and scan periodically until Ctrl-C
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--config`: Use a specific configuration file
//!
//! # Example
//!
//! ```bash
//! critpath analyze --delay task-3=4
//! critpath simulate task-1 5
//! critpath --json latest
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{AnalyzeArgs, LatestArgs, ScanArgs, SimulateArgs, WatchArgs};
pub use validators::{parse_delay, validate_task_id};

/// Critpath - schedule impact analysis for task graphs
///
/// Computes critical paths, simulates delay ripple effects and flags overdue
/// work. Tasks are read from `.critpath/tasks.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "critpath")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: .critpath/config.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compute the critical path of the active tasks
    ///
    /// Prints earliest/latest start and finish, float and the critical path.
    Analyze(AnalyzeArgs),

    /// Simulate delaying a task
    ///
    /// Lists every downstream task that would shift and gives a risk assessment.
    /// No enrichment service is wired into the command line, so the assessment
    /// always comes from the built-in heuristic.
    Simulate(SimulateArgs),

    /// Flag overdue tasks and refresh the impact snapshot
    Scan(ScanArgs),

    /// Show the cached impact snapshot
    Latest(LatestArgs),

    /// Keep the impact snapshot current until interrupted
    ///
    /// Reloads the task file before every scan and recalculates when it changed.
    /// Project assessments come from the built-in heuristic.
    Watch(WatchArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Critpath schedule impact analysis");
            println!("Use --help for more information");
            return Ok(());
        };

        let app = App::from_directory(&std::env::current_dir()?, self.config.as_deref()).await?;
        match command {
            Commands::Analyze(args) => execute::execute_analyze(&app, args, output_mode).await,
            Commands::Simulate(args) => execute::execute_simulate(&app, args, output_mode).await,
            Commands::Scan(args) => execute::execute_scan(&app, args, output_mode).await,
            Commands::Latest(args) => execute::execute_latest(&app, args, output_mode).await,
            Commands::Watch(args) => execute::execute_watch(&app, args, output_mode).await,
        }
    }
}
