//! Greedy track assignment.
//!
//! Tasks are placed in (start ascending, duration descending, input order) order,
//! each on the lowest track that is free on every day of its range. For interval
//! data this uses exactly as many tracks as the busiest day has tasks.

use crate::task::{SpanningTask, TaskId};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on track search
pub const MAX_TRACKS: usize = 100;

/// A task's placement on one calendar day
#[derive(Clone, Debug)]
pub struct TrackAssignment {
    pub task: Arc<SpanningTask>,
    pub track: usize,
    pub start_col: u32, // 0-6 within the week row
    pub end_col: u32,
}

impl TrackAssignment {
    pub fn task_id(&self) -> &str {
        self.task.id()
    }

    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.task.start_date() == date
    }
}

/// One week-row segment of a task's bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekSegment {
    pub week_start: NaiveDate,
    pub track: usize,
    pub start_col: u32,
    pub end_col: u32,
}

/// All assignments covering a day, ordered by track
#[derive(Clone, Debug)]
pub struct DayTrackSet {
    pub date: NaiveDate,
    pub assignments: Vec<TrackAssignment>,
}

impl DayTrackSet {
    /// Highest occupied track + 1
    pub fn depth(&self) -> usize {
        self.assignments
            .iter()
            .map(|assignment| assignment.track + 1)
            .max()
            .unwrap_or(0)
    }
}

/// First day of the week row containing `date`
pub fn week_start_for(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset =
        (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date - Duration::days(offset as i64)
}

/// Per-run track assigner
pub struct TaskStacker {
    tasks: Vec<Arc<SpanningTask>>,
    week_start: Weekday,
    days: BTreeMap<NaiveDate, DayTrackSet>,
    tracks: HashMap<TaskId, usize>,
    skipped: Vec<TaskId>,
    max_tracks: usize,
}

impl TaskStacker {
    pub fn new(tasks: Vec<SpanningTask>) -> Self {
        Self {
            tasks: tasks.into_iter().map(Arc::new).collect(),
            week_start: Weekday::Mon,
            days: BTreeMap::new(),
            tracks: HashMap::new(),
            skipped: Vec::new(),
            max_tracks: 0,
        }
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn tasks(&self) -> &[Arc<SpanningTask>] {
        &self.tasks
    }

    /// Assign tracks to every task, replacing any earlier result
    pub fn compute_stacks(&mut self) {
        self.days.clear();
        self.tracks.clear();
        self.skipped.clear();
        self.max_tracks = 0;

        let mut order: Vec<usize> = Vec::with_capacity(self.tasks.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if !task.task.has_valid_range() {
                warn!(
                    "Skipping task {} ('{}'): end date {} precedes start date {}",
                    task.id(),
                    task.task.name,
                    task.end_date(),
                    task.start_date()
                );
                self.skipped.push(task.id().to_string());
            } else if !seen.insert(task.id()) {
                warn!(
                    "Skipping task {} ('{}'): id already used by an earlier task",
                    task.id(),
                    task.task.name
                );
                self.skipped.push(task.id().to_string());
            } else {
                order.push(index);
            }
        }

        // Stable sort: input order breaks remaining ties
        order.sort_by(|&a, &b| {
            let (a, b) = (&self.tasks[a], &self.tasks[b]);
            a.start_date()
                .cmp(&b.start_date())
                .then_with(|| b.task.elapsed_days().cmp(&a.task.elapsed_days()))
        });

        let mut occupancy: BTreeMap<NaiveDate, BTreeSet<usize>> = BTreeMap::new();

        for index in order {
            let task = Arc::clone(&self.tasks[index]);
            let days: Vec<NaiveDate> = task.task.days().collect();
            let track = Self::find_free_track(&occupancy, &days).unwrap_or_else(|| {
                warn!(
                    "No free track below {} for task {}; using the last track",
                    MAX_TRACKS,
                    task.id()
                );
                MAX_TRACKS - 1
            });

            for &day in &days {
                occupancy.entry(day).or_default().insert(track);
                let (start_col, end_col) = self.columns_for(&task, day);
                self.days
                    .entry(day)
                    .or_insert_with(|| DayTrackSet {
                        date: day,
                        assignments: Vec::new(),
                    })
                    .assignments
                    .push(TrackAssignment {
                        task: Arc::clone(&task),
                        track,
                        start_col,
                        end_col,
                    });
            }

            debug!("Task {} assigned to track {}", task.id(), track);
            self.tracks.insert(task.id().to_string(), track);
            self.max_tracks = self.max_tracks.max(track + 1);
        }

        for day in self.days.values_mut() {
            day.assignments.sort_by_key(|assignment| assignment.track);
        }

        info!(
            "Stacked {} tasks on {} tracks across {} days ({} skipped)",
            self.tracks.len(),
            self.max_tracks,
            self.days.len(),
            self.skipped.len()
        );
    }

    fn find_free_track(
        occupancy: &BTreeMap<NaiveDate, BTreeSet<usize>>,
        days: &[NaiveDate],
    ) -> Option<usize> {
        (0..MAX_TRACKS).find(|track| {
            days.iter().all(|day| {
                occupancy
                    .get(day)
                    .is_none_or(|occupied| !occupied.contains(track))
            })
        })
    }

    /// Clamp the task range to the week containing `day`
    fn columns_for(&self, task: &SpanningTask, day: NaiveDate) -> (u32, u32) {
        let week_start = week_start_for(day, self.week_start);
        let week_end = week_start + Duration::days(6);
        let start = task.start_date().max(week_start);
        let end = task.end_date().min(week_end);
        (
            (start - week_start).num_days() as u32,
            (end - week_start).num_days() as u32,
        )
    }

    /// Assignments covering `date`, sorted by track
    pub fn stacks_for_day(&self, date: NaiveDate) -> &[TrackAssignment] {
        self.days
            .get(&date)
            .map(|day| day.assignments.as_slice())
            .unwrap_or(&[])
    }

    /// Assignments whose task starts on `date`
    pub fn tasks_starting_on_day(&self, date: NaiveDate) -> Vec<&TrackAssignment> {
        self.stacks_for_day(date)
            .iter()
            .filter(|assignment| assignment.starts_on(date))
            .collect()
    }

    /// Assignments carried over from an earlier day
    pub fn tasks_continuing_on_day(&self, date: NaiveDate) -> Vec<&TrackAssignment> {
        self.stacks_for_day(date)
            .iter()
            .filter(|assignment| assignment.task.start_date() < date)
            .collect()
    }

    pub fn day_depth(&self, date: NaiveDate) -> usize {
        self.days.get(&date).map(DayTrackSet::depth).unwrap_or(0)
    }

    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    pub fn track_of(&self, task_id: &str) -> Option<usize> {
        self.tracks.get(task_id).copied()
    }

    /// Tasks excluded because their end date precedes their start date
    pub fn skipped_tasks(&self) -> &[TaskId] {
        &self.skipped
    }

    pub fn days(&self) -> impl Iterator<Item = &DayTrackSet> {
        self.days.values()
    }

    /// One segment per week row the task crosses
    pub fn week_segments(&self, task_id: &str) -> Vec<WeekSegment> {
        let Some(track) = self.track_of(task_id) else {
            return Vec::new();
        };
        let Some(task) = self.tasks.iter().find(|task| task.id() == task_id) else {
            return Vec::new();
        };

        let mut segments = Vec::new();
        let mut week_start = week_start_for(task.start_date(), self.week_start);
        while week_start <= task.end_date() {
            let (start_col, end_col) = self.columns_for(task, week_start.max(task.start_date()));
            segments.push(WeekSegment {
                week_start,
                track,
                start_col,
                end_col,
            });
            week_start += Duration::days(7);
        }
        segments
    }
}
