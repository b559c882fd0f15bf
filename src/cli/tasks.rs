//! Task input parsing and file handling
//!
//! Task lists arrive as CSV exports from spreadsheets and project tools:
//! - Delimiter is detected from the header line (comma, semicolon, tab)
//! - Column headers are matched loosely ("Task Name", "Start Date", "Due", ...)
//! - Rows without an id get a stable one derived from name and dates

use crate::task::{Task, TaskId, TaskStatus};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Names matching this are treated as milestones when no milestone column says otherwise
pub const DEFAULT_MILESTONE_PATTERN: &str = r"(?i)milestone|deliverable|deadline|★";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File '{path}' not found")]
    NotFound { path: PathBuf },

    #[error("IO error reading '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("'{path}' is missing required columns {missing:?} (found {found:?})")]
    MissingColumns {
        path: PathBuf,
        missing: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("'{path}' line {line}: cannot parse date '{value}'")]
    InvalidDate {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("'{path}' line {line}: task '{name}' ends ({end}) before it starts ({start})")]
    InvalidDateRange {
        path: PathBuf,
        line: usize,
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("'{path}' contains no tasks")]
    Empty { path: PathBuf },

    #[error("invalid milestone pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Start,
    End,
    Category,
    Description,
    Milestone,
    Status,
    Assignee,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let normalized = header.trim().to_lowercase().replace([' ', '-', '_'], "");
        match normalized.as_str() {
            "id" | "taskid" | "key" => Some(Self::Id),
            "name" | "task" | "taskname" | "title" | "label" | "activity" => Some(Self::Name),
            "start" | "startdate" | "from" | "begin" => Some(Self::Start),
            "end" | "enddate" | "to" | "finish" | "due" | "duedate" => Some(Self::End),
            "category" | "phase" | "type" | "group" => Some(Self::Category),
            "description" | "notes" | "note" | "details" | "comments" => Some(Self::Description),
            "milestone" | "ismilestone" => Some(Self::Milestone),
            "status" | "state" => Some(Self::Status),
            "assignee" | "owner" | "assignedto" | "responsible" => Some(Self::Assignee),
            _ => None,
        }
    }

    fn required() -> [(Self, &'static str); 3] {
        [
            (Self::Name, "name"),
            (Self::Start, "start"),
            (Self::End, "end"),
        ]
    }
}

/// Result of a load: tasks in file order plus the rows that were passed over
#[derive(Debug, Clone, Default)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    pub skipped_rows: Vec<usize>,
}

/// Task loader responsible for reading CSV task lists
#[derive(Debug, Clone)]
pub struct TaskLoader {
    milestone_pattern: Option<Regex>,
}

impl Default for TaskLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLoader {
    pub fn new() -> Self {
        Self {
            milestone_pattern: Regex::new(DEFAULT_MILESTONE_PATTERN).ok(),
        }
    }

    pub fn with_milestone_pattern(mut self, pattern: &str) -> Result<Self, FileError> {
        self.milestone_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Load and parse a CSV task file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<LoadedTasks, FileError> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading task file: {:?}", path);

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound { path: path.clone() },
            _ => FileError::IoError {
                path: path.clone(),
                source: e,
            },
        })?;

        let loaded = self.parse_csv(&content, &path)?;
        info!(
            "Loaded {} tasks from {:?} ({} rows skipped)",
            loaded.tasks.len(),
            path,
            loaded.skipped_rows.len()
        );
        Ok(loaded)
    }

    /// Parse CSV content; `source_path` is only used for error messages
    pub fn parse_csv(&self, content: &str, source_path: &Path) -> Result<LoadedTasks, FileError> {
        let first_line = content.lines().next().unwrap_or("");
        let delimiter = detect_delimiter(first_line);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let csv_error = |source| FileError::Csv {
            path: source_path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(csv_error)?.clone();
        let columns: Vec<Option<Column>> = headers.iter().map(Column::from_header).collect();

        let missing: Vec<&'static str> = Column::required()
            .into_iter()
            .filter(|(column, _)| !columns.contains(&Some(*column)))
            .map(|(_, label)| label)
            .collect();
        if !missing.is_empty() {
            return Err(FileError::MissingColumns {
                path: source_path.to_path_buf(),
                missing,
                found: headers.iter().map(str::to_string).collect(),
            });
        }

        let mut loaded = LoadedTasks::default();
        let mut seen_ids: HashSet<TaskId> = HashSet::new();

        for (index, record) in reader.records().enumerate() {
            let line = index + 2; // header is line 1
            let record = record.map_err(csv_error)?;

            let field = |wanted: Column| {
                columns
                    .iter()
                    .position(|column| *column == Some(wanted))
                    .and_then(|position| record.get(position))
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            };

            let Some(name) = field(Column::Name) else {
                debug!("Skipping line {}: no task name", line);
                loaded.skipped_rows.push(line);
                continue;
            };

            let start = parse_date_field(field(Column::Start), line, source_path)?;
            let end = parse_date_field(field(Column::End), line, source_path)?;
            if end < start {
                return Err(FileError::InvalidDateRange {
                    path: source_path.to_path_buf(),
                    line,
                    name: name.to_string(),
                    start,
                    end,
                });
            }

            let id = field(Column::Id)
                .map(str::to_string)
                .unwrap_or_else(|| derived_id(name, start, end));
            let id = unique_id(id, &mut seen_ids);

            let is_milestone = match field(Column::Milestone) {
                Some(flag) => is_truthy(flag),
                None => self.name_marks_milestone(name),
            };

            let mut task = Task::new(id, name, start, end);
            if let Some(category) = field(Column::Category) {
                task = task.with_category(category);
            }
            if let Some(description) = field(Column::Description) {
                task = task.with_description(description);
            }
            if let Some(status) = field(Column::Status) {
                task = task.with_status(TaskStatus::parse(status));
            }
            if let Some(assignee) = field(Column::Assignee) {
                task = task.with_assignee(assignee);
            }
            if is_milestone {
                task = task.as_milestone();
            }

            loaded.tasks.push(task);
        }

        if loaded.tasks.is_empty() {
            return Err(FileError::Empty {
                path: source_path.to_path_buf(),
            });
        }

        Ok(loaded)
    }

    fn name_marks_milestone(&self, name: &str) -> bool {
        self.milestone_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name))
    }
}

/// Pick the separator that occurs most often in the header line, preferring commas on ties
fn detect_delimiter(first_line: &str) -> u8 {
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();
    let tabs = first_line.matches('\t').count();

    if semicolons > commas && semicolons >= tabs {
        b';'
    } else if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn parse_date_field(
    value: Option<&str>,
    line: usize,
    source_path: &Path,
) -> Result<NaiveDate, FileError> {
    value.and_then(parse_date).ok_or_else(|| FileError::InvalidDate {
        path: source_path.to_path_buf(),
        line,
        value: value.unwrap_or_default().to_string(),
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x" | "milestone" | "✓" | "★"
    )
}

fn derived_id(name: &str, start: NaiveDate, end: NaiveDate) -> TaskId {
    let key = format!("{}|{}|{}", name, start, end);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

fn unique_id(id: TaskId, seen: &mut HashSet<TaskId>) -> TaskId {
    if seen.insert(id.clone()) {
        return id;
    }

    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", id, suffix);
        if seen.insert(candidate.clone()) {
            warn!("Duplicate task id '{}' renamed to '{}'", id, candidate);
            return candidate;
        }
        suffix += 1;
    }
}
