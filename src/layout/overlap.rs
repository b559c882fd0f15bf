//! Date-range overlap detection and grouping.
//!
//! Two tasks overlap when their inclusive date ranges share at least one day.
//! The analyzer reports every overlapping pair with a type and severity, and
//! partitions the input into overlap groups: maximal sets of tasks connected
//! transitively through overlaps. Tasks that overlap nothing form singleton groups.

use crate::task::{SpanningTask, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Shape of the intersection between two date ranges
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlapType {
    Identical, // same start and end
    Nested,    // one range lies within the other
    Adjacent,  // only a boundary day is shared
    Partial,   // ranges cross
}

/// Severity tiers with numeric values for comparison
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictSeverity {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl ConflictSeverity {
    /// Tier for a partial overlap covering `ratio` of the shorter task
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            Self::High
        } else if ratio >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One overlapping pair; `first` precedes `second` in start order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskOverlap {
    pub first: TaskId,
    pub second: TaskId,
    pub overlap_type: OverlapType,
    pub overlap_start: NaiveDate,
    pub overlap_end: NaiveDate,
    pub overlap_days: i64,
    pub overlap_ratio: f64, // overlap days relative to the shorter task's span
    pub severity: ConflictSeverity,
}

impl TaskOverlap {
    pub fn involves(&self, task_id: &str) -> bool {
        self.first == task_id || self.second == task_id
    }
}

/// Maximal set of transitively overlapping tasks
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OverlapGroup {
    pub tasks: Vec<TaskId>, // ordered by start date, then input order
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub overlap_count: usize,
    pub max_severity: Option<ConflictSeverity>,
}

impl OverlapGroup {
    pub fn is_conflicted(&self) -> bool {
        self.tasks.len() > 1
    }
}

/// Result of analyzing one task list
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OverlapAnalysis {
    pub overlaps: Vec<TaskOverlap>,
    pub groups: Vec<OverlapGroup>,
    conflicted: BTreeSet<TaskId>,
    group_index: BTreeMap<TaskId, usize>,
}

impl OverlapAnalysis {
    /// Whether the task takes part in any overlap
    pub fn is_conflicted(&self, task_id: &str) -> bool {
        self.conflicted.contains(task_id)
    }

    pub fn conflicted_tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.conflicted.iter()
    }

    pub fn group_of(&self, task_id: &str) -> Option<&OverlapGroup> {
        self.group_index
            .get(task_id)
            .and_then(|&index| self.groups.get(index))
    }

    pub fn overlaps_for(&self, task_id: &str) -> Vec<&TaskOverlap> {
        self.overlaps
            .iter()
            .filter(|overlap| overlap.involves(task_id))
            .collect()
    }

    pub fn severity_counts(&self) -> BTreeMap<ConflictSeverity, usize> {
        let mut counts = BTreeMap::new();
        for overlap in &self.overlaps {
            *counts.entry(overlap.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_critical_overlaps(&self) -> bool {
        self.overlaps
            .iter()
            .any(|overlap| overlap.severity == ConflictSeverity::Critical)
    }

    pub fn summary(&self) -> String {
        let counts = self.severity_counts();
        let count = |severity| counts.get(&severity).copied().unwrap_or(0);
        format!(
            "Overlap Analysis:\n  Overlapping pairs: {}\n  Groups: {} ({} conflicted)\n  Critical: {}, High: {}, Medium: {}, Low: {}",
            self.overlaps.len(),
            self.groups.len(),
            self.groups.iter().filter(|g| g.is_conflicted()).count(),
            count(ConflictSeverity::Critical),
            count(ConflictSeverity::High),
            count(ConflictSeverity::Medium),
            count(ConflictSeverity::Low),
        )
    }
}

/// Pairwise overlap detector
#[derive(Debug, Clone, Default)]
pub struct OverlapAnalyzer;

impl OverlapAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze tasks with valid date ranges; inverted ranges are left out
    pub fn analyze(&self, tasks: &[SpanningTask]) -> OverlapAnalysis {
        let mut order: Vec<usize> = (0..tasks.len())
            .filter(|&i| tasks[i].task.has_valid_range())
            .collect();
        // Stable sort keeps input order for equal starts
        order.sort_by_key(|&i| tasks[i].start_date());

        let mut analysis = OverlapAnalysis::default();

        for (pos, &i) in order.iter().enumerate() {
            let a = &tasks[i];
            for &j in &order[pos + 1..] {
                let b = &tasks[j];
                if b.start_date() > a.end_date() {
                    break;
                }
                let overlap = Self::classify(a, b);
                analysis.conflicted.insert(overlap.first.clone());
                analysis.conflicted.insert(overlap.second.clone());
                analysis.overlaps.push(overlap);
            }
        }

        analysis.groups = Self::build_groups(tasks, &order, &analysis.overlaps);
        for (index, group) in analysis.groups.iter().enumerate() {
            for task_id in &group.tasks {
                analysis.group_index.insert(task_id.clone(), index);
            }
        }

        debug!(
            "Analyzed {} tasks: {} overlaps in {} groups",
            order.len(),
            analysis.overlaps.len(),
            analysis.groups.len()
        );

        analysis
    }

    /// Classify an overlapping pair; `a` must not start after `b`
    fn classify(a: &SpanningTask, b: &SpanningTask) -> TaskOverlap {
        let (a_start, a_end) = (a.start_date(), a.end_date());
        let (b_start, b_end) = (b.start_date(), b.end_date());

        let overlap_start = a_start.max(b_start);
        let overlap_end = a_end.min(b_end);
        let overlap_days = (overlap_end - overlap_start).num_days() + 1;
        let shorter = a.task.span_days().min(b.task.span_days()).max(1);
        let overlap_ratio = overlap_days as f64 / shorter as f64;

        let a_within_b = b_start <= a_start && a_end <= b_end;
        let b_within_a = a_start <= b_start && b_end <= a_end;

        let overlap_type = if a_start == b_start && a_end == b_end {
            OverlapType::Identical
        } else if a_within_b || b_within_a {
            OverlapType::Nested
        } else if overlap_days == 1 && (a_end == b_start || b_end == a_start) {
            OverlapType::Adjacent
        } else {
            OverlapType::Partial
        };

        let severity = match overlap_type {
            OverlapType::Identical => ConflictSeverity::Critical,
            OverlapType::Nested => ConflictSeverity::High,
            OverlapType::Adjacent => ConflictSeverity::Low,
            OverlapType::Partial => ConflictSeverity::from_ratio(overlap_ratio),
        };

        TaskOverlap {
            first: a.id().to_string(),
            second: b.id().to_string(),
            overlap_type,
            overlap_start,
            overlap_end,
            overlap_days,
            overlap_ratio,
            severity,
        }
    }

    /// Sweep the start-ordered tasks, extending the current group while the next
    /// task starts on or before the group's latest end date.
    fn build_groups(
        tasks: &[SpanningTask],
        order: &[usize],
        overlaps: &[TaskOverlap],
    ) -> Vec<OverlapGroup> {
        let mut groups: Vec<OverlapGroup> = Vec::new();

        for &i in order {
            let task = &tasks[i];
            match groups.last_mut() {
                Some(group) if task.start_date() <= group.end_date => {
                    group.tasks.push(task.id().to_string());
                    group.end_date = group.end_date.max(task.end_date());
                }
                _ => groups.push(OverlapGroup {
                    tasks: vec![task.id().to_string()],
                    start_date: task.start_date(),
                    end_date: task.end_date(),
                    overlap_count: 0,
                    max_severity: None,
                }),
            }
        }

        for group in &mut groups {
            let members: BTreeSet<&str> = group.tasks.iter().map(String::as_str).collect();
            for overlap in overlaps
                .iter()
                .filter(|o| members.contains(o.first.as_str()))
            {
                group.overlap_count += 1;
                group.max_severity = group.max_severity.max(Some(overlap.severity));
            }
        }

        groups
    }
}
