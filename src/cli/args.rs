//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `layout`: Compute the month layout for a CSV task list and emit JSON
//! - `analyze`: Print overlap, priority and stacking summaries
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default configuration file

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Layout(LayoutRunConfig),
    Analyze(AnalyzeConfig),
    ShowConfig,                  // Show configuration discovery info
    InitConfig(Option<PathBuf>), // Target path, user config when absent
}

#[derive(Debug)]
pub struct LayoutRunConfig {
    pub tasks_file: PathBuf,
    pub month: Option<(i32, u32)>, // defaults to the month of the earliest task
    pub config_override: Option<PathBuf>,
    pub today: Option<NaiveDate>,
    pub pretty: bool,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct AnalyzeConfig {
    pub tasks_file: PathBuf,
    pub config_override: Option<PathBuf>,
    pub today: Option<NaiveDate>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "planner-layout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stacks overlapping calendar tasks into tracks and lays them out per day")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the month layout and print per-day descriptors as JSON
    Layout {
        /// CSV task list
        file: PathBuf,
        /// Month to lay out (YYYY-MM)
        #[arg(short = 'm', long = "month", value_name = "YYYY-MM")]
        month: Option<String>,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Reference date for urgency labels (YYYY-MM-DD)
        #[arg(long = "today", value_name = "YYYY-MM-DD")]
        today: Option<String>,
        /// Pretty-print the JSON output
        #[arg(short = 'p', long = "pretty")]
        pretty: bool,
        /// Write the JSON to a file instead of stdout
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Print overlap, priority and stacking summaries
    Analyze {
        /// CSV task list
        file: PathBuf,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Reference date for urgency labels (YYYY-MM-DD)
        #[arg(long = "today", value_name = "YYYY-MM-DD")]
        today: Option<String>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file
    InitConfig {
        /// Target path (defaults to ~/.planner/config.toml)
        path: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Layout {
                file,
                month,
                config,
                today,
                pretty,
                output,
                verbose,
            }) => Ok(ExecutionMode::Layout(LayoutRunConfig {
                tasks_file: file.clone(),
                month: month.as_deref().map(parse_month).transpose()?,
                config_override: config.clone(),
                today: today.as_deref().map(parse_day).transpose()?,
                pretty: *pretty,
                output: output.clone(),
                verbose: *verbose,
            })),
            Some(Commands::Analyze {
                file,
                config,
                today,
                verbose,
            }) => Ok(ExecutionMode::Analyze(AnalyzeConfig {
                tasks_file: file.clone(),
                config_override: config.clone(),
                today: today.as_deref().map(parse_day).transpose()?,
                verbose: *verbose,
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig { path }) => Ok(ExecutionMode::InitConfig(path.clone())),
            None => Err(
                "No command specified. Use 'planner-layout --help' to see available commands."
                    .to_string(),
            ),
        }
    }

    /// Whether the selected command asked for debug logging
    pub fn verbose(&self) -> bool {
        matches!(
            self.command,
            Some(Commands::Layout { verbose: true, .. }) | Some(Commands::Analyze { verbose: true, .. })
        )
    }
}

/// Parse `YYYY-MM` into a (year, month) pair
fn parse_month(raw: &str) -> Result<(i32, u32), String> {
    let invalid = || format!("Invalid month '{}', expected YYYY-MM", raw);
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}
