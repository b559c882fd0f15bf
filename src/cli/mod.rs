//! CLI-specific functionality for the planner layout engine
//!
//! This module contains all CLI-related code including argument parsing,
//! CSV task loading, and configuration discovery.

pub mod args;
pub mod config;
pub mod tasks;

pub use args::{AnalyzeConfig, Args, Commands, ExecutionMode, LayoutRunConfig};
pub use config::{CalendarConfig, ConfigDiscovery, ConfigError, LayoutConfig};
pub use tasks::{FileError, LoadedTasks, TaskLoader};
