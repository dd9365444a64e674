//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::Parser;

use super::validators::{parse_delay, validate_task_id};

/// Arguments for the `analyze` command
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Apply a delay to a task (repeatable)
    ///
    /// Format: `TASK_ID=DAYS`. Delays only feed the impact score; they do not
    /// move the schedule.
    #[arg(short, long = "delay", value_name = "TASK_ID=DAYS", value_parser = parse_delay)]
    pub delays: Vec<(String, u32)>,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// The task to delay
    #[arg(value_parser = validate_task_id)]
    pub task_id: String,

    /// Delay in days (clamped to 0-60, fractions rounded down)
    #[arg(allow_negative_numbers = true)]
    pub delay_days: f64,
}

/// Arguments for the `scan` command
#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// Do not write flag activities back to the task file
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `latest` command
#[derive(Parser, Debug, Clone, Default)]
pub struct LatestArgs {}

/// Arguments for the `watch` command
#[derive(Parser, Debug, Clone)]
pub struct WatchArgs {
    /// Override the configured slippage scan interval (seconds)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub scan_interval: Option<u64>,
}
