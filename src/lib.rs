//! # Planner Layout
//!
//! Task stacking and conflict-resolution layout for a monthly calendar planner.
//! Tasks spanning several days are drawn as horizontal bars; when bars overlap
//! they are assigned to separate tracks so none of them hides another.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: Task records, spanning tasks and category colors
//! - **[`layout`]**: Track assignment, overlap analysis, priority ranking,
//!   rule-based stacking and vertical space optimization
//! - **[`render`]**: Per-day views and month grids over computed assignments
//! - **[`cli`]**: CSV task loading, TOML configuration and argument parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use planner_layout::{LayoutPass, Task, TaskStackRenderer};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
//! let tasks = vec![
//!     Task::new("a", "Draft proposal", day(1), day(5)),
//!     Task::new("b", "Lab booking", day(3), day(10)),
//!     Task::new("c", "Committee meeting", day(12), day(14)),
//! ];
//!
//! let output = LayoutPass::default().run(tasks, None, None);
//! assert_eq!(output.stacker.max_tracks(), 2);
//!
//! let renderer = TaskStackRenderer::from_output(&output);
//! let descriptors = renderer.day_descriptors(day(4));
//! assert_eq!(descriptors.len(), 2);
//! ```

/// Task records and their calendar representation.
pub mod task;

/// Layout computation.
///
/// The track assigner keeps overlapping bars apart; the stacking engine
/// decides how each bar is drawn and sized within the available area.
pub mod layout;

/// Rendering adapter over computed assignments.
pub mod render;

/// Environment constants and path utilities.
pub mod env;

// CLI module for command-line interface
pub mod cli;

// Re-export main task types
pub use task::{SpanningTask, Task, TaskColor, TaskId, TaskStatus};

// Re-export layout entry points
pub use layout::{
    CalendarWindow, LayoutOutput, LayoutPass, OverlapAnalyzer, PriorityRanker, StackingContext,
    StackingEngine, StackingResult, TaskStacker, VisualConstraints,
};

// Re-export rendering types
pub use render::{DayDescriptor, MonthGrid, MonthLayout, TaskStackRenderer};
