use crate::task::color::TaskColor;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier carried over from the task source (CSV `id` column or a derived UUID)
pub type TaskId = String;

/// Planner task as supplied by the input boundary
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Workflow state of a task
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
    /// Free-form status text that matched none of the known states
    Other(String),
}

impl TaskStatus {
    /// Parse loosely formatted status text ("In Progress", "done", "todo", ...)
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "" | "planned" | "todo" | "to do" | "not started" | "new" | "pending" => Self::Planned,
            "in progress" | "active" | "started" | "ongoing" => Self::InProgress,
            "completed" | "complete" | "done" | "finished" => Self::Completed,
            "blocked" | "on hold" | "waiting" => Self::Blocked,
            "cancelled" | "canceled" | "dropped" => Self::Cancelled,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Progress percentage implied by the status, when the status implies one
    pub fn implied_progress(&self) -> Option<u8> {
        match self {
            Self::Planned => Some(0),
            Self::InProgress => Some(50),
            Self::Completed => Some(100),
            Self::Blocked | Self::Cancelled | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "Planned"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Other(text) => write!(f, "{}", text),
        }
    }
}

impl Task {
    /// Create a task with empty optional fields
    pub fn new(
        id: impl Into<TaskId>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            start_date,
            end_date,
            is_milestone: false,
            status: TaskStatus::default(),
            assignee: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn as_milestone(mut self) -> Self {
        self.is_milestone = true;
        self
    }

    /// Days between start and end; a single-day task has zero elapsed days
    pub fn elapsed_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Number of calendar days covered, inclusive of both ends
    pub fn span_days(&self) -> i64 {
        self.elapsed_days() + 1
    }

    pub fn duration_hours(&self) -> f64 {
        (self.elapsed_days() * 24) as f64
    }

    pub fn has_valid_range(&self) -> bool {
        self.start_date <= self.end_date
    }

    /// Inclusive date-range intersection test
    pub fn overlaps(&self, other: &Task) -> bool {
        !(self.end_date < other.start_date || other.end_date < self.start_date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every calendar day in the task's range; empty for inverted ranges
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let span = if self.has_valid_range() {
            self.span_days()
        } else {
            0
        };
        (0..span).map(move |offset| self.start_date + Duration::days(offset))
    }
}

/// Task as laid out on the calendar: the input task plus its display color and progress
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpanningTask {
    pub task: Task,
    pub color: TaskColor,
    pub progress: Option<u8>, // 0-100
}

impl SpanningTask {
    pub fn new(task: Task) -> Self {
        let color = TaskColor::for_category(&task.category);
        let progress = task.status.implied_progress();
        Self {
            task,
            color,
            progress,
        }
    }

    /// Override the progress percentage, clamped to 100
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.task.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.task.end_date
    }
}

impl From<Task> for SpanningTask {
    fn from(task: Task) -> Self {
        Self::new(task)
    }
}

/// Wrap every task in a [`SpanningTask`], preserving input order
pub fn spanning_tasks(tasks: impl IntoIterator<Item = Task>) -> Vec<SpanningTask> {
    tasks.into_iter().map(SpanningTask::new).collect()
}
