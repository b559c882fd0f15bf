//! Rendering adapter.
//!
//! Pure reads of an already computed [`TaskStacker`]: which assignments start on
//! a day (rendered with a label), which continue from an earlier day (bar only),
//! and how deep the day's cell must be.

use crate::layout::{LayoutOutput, TaskStacker, TrackAssignment};
use crate::render::grid::MonthGrid;
use crate::task::TaskId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the template needs to draw one day cell
#[derive(Debug, Clone)]
pub struct DayRenderInfo<'a> {
    pub date: NaiveDate,
    pub all_stacks: &'a [TrackAssignment],
    pub starting: Vec<&'a TrackAssignment>,
    pub continuing: Vec<&'a TrackAssignment>,
    pub depth: usize,
    pub max_tracks: usize,
}

impl DayRenderInfo<'_> {
    pub fn tasks_visible(&self) -> usize {
        self.all_stacks.len()
    }

    pub fn tasks_starting(&self) -> usize {
        self.starting.len()
    }

    pub fn should_show_continuation(&self) -> bool {
        self.tasks_visible() > self.tasks_starting()
    }
}

/// Flat, serializable descriptor for one task bar on one day
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DayDescriptor {
    pub task_id: TaskId,
    pub name: String,
    pub category: String,
    pub track: usize,
    pub start_col: u32,
    pub end_col: u32,
    pub height: f64,
    pub color: String, // `r,g,b`
    pub is_starting: bool,
    pub is_milestone: bool,
    pub progress: Option<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DayLayout {
    pub date: NaiveDate,
    pub week_row: usize,
    pub column: usize,
    pub depth: usize,
    pub show_continuation: bool,
    pub tasks: Vec<DayDescriptor>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonthLayout {
    pub year: i32,
    pub month: u32,
    pub max_tracks: usize,
    pub week_rows: usize,
    pub days: Vec<DayLayout>,
}

pub struct TaskStackRenderer<'a> {
    stacker: &'a TaskStacker,
    heights: HashMap<TaskId, f64>,
    default_height: f64,
}

impl<'a> TaskStackRenderer<'a> {
    pub fn new(stacker: &'a TaskStacker, default_height: f64) -> Self {
        Self {
            stacker,
            heights: HashMap::new(),
            default_height,
        }
    }

    /// Renderer using the optimized heights of a layout pass
    pub fn from_output(output: &'a LayoutOutput) -> Self {
        Self::new(&output.stacker, output.context.constraints.min_task_height)
            .with_heights(output.vertical.heights())
    }

    pub fn with_heights(mut self, heights: HashMap<TaskId, f64>) -> Self {
        self.heights = heights;
        self
    }

    pub fn day_info(&self, date: NaiveDate) -> DayRenderInfo<'a> {
        let stacker: &'a TaskStacker = self.stacker;
        DayRenderInfo {
            date,
            all_stacks: stacker.stacks_for_day(date),
            starting: stacker.tasks_starting_on_day(date),
            continuing: stacker.tasks_continuing_on_day(date),
            depth: stacker.day_depth(date),
            max_tracks: stacker.max_tracks(),
        }
    }

    pub fn day_descriptors(&self, date: NaiveDate) -> Vec<DayDescriptor> {
        self.stacker
            .stacks_for_day(date)
            .iter()
            .map(|assignment| self.describe(assignment, date))
            .collect()
    }

    fn describe(&self, assignment: &TrackAssignment, date: NaiveDate) -> DayDescriptor {
        let spanning = &assignment.task;
        DayDescriptor {
            task_id: spanning.task.id.clone(),
            name: spanning.task.name.clone(),
            category: spanning.task.category.clone(),
            track: assignment.track,
            start_col: assignment.start_col,
            end_col: assignment.end_col,
            height: self
                .heights
                .get(&spanning.task.id)
                .copied()
                .unwrap_or(self.default_height),
            color: spanning.color.to_rgb_string(),
            is_starting: assignment.starts_on(date),
            is_milestone: spanning.task.is_milestone,
            progress: spanning.progress,
        }
    }

    pub fn month_layout(&self, year: i32, month: u32) -> Option<MonthLayout> {
        let grid = MonthGrid::new(year, month, self.stacker.week_start())?;
        let days = grid
            .cells()
            .map(|(week_row, column, date)| {
                let info = self.day_info(date);
                DayLayout {
                    date,
                    week_row,
                    column,
                    depth: info.depth,
                    show_continuation: info.should_show_continuation(),
                    tasks: self.day_descriptors(date),
                }
            })
            .collect();

        Some(MonthLayout {
            year,
            month,
            max_tracks: self.stacker.max_tracks(),
            week_rows: grid.weeks.len(),
            days,
        })
    }
}
