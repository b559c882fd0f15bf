use crate::task::{SpanningTask, Task, TaskId, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Visual prominence tiers with numeric values for ordering
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisualProminence {
    Minimal = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Critical = 5,
}

impl VisualProminence {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else if score >= 0.2 {
            Self::Low
        } else {
            Self::Minimal
        }
    }
}

/// Informational timing label relative to the supplied current date
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    Past,     // finished before today
    Overdue,  // ended before today without completing
    Active,   // today falls within the range
    Upcoming, // starts within the upcoming window
    Future,
}

/// Weights for the prominence score
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    pub category_weight: f64,
    pub milestone_weight: f64,
    pub duration_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            category_weight: 0.5,
            milestone_weight: 0.3,
            duration_weight: 0.2,
        }
    }
}

impl ScoringWeights {
    fn total(&self) -> f64 {
        self.category_weight + self.milestone_weight + self.duration_weight
    }
}

/// Ranker configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityConfig {
    pub weights: ScoringWeights,
    /// Category factor in [0, 1], keyed by upper-case category name
    pub category_weights: BTreeMap<String, f64>,
    pub default_category_weight: f64,
    pub upcoming_window_days: i64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        let category_weights = [
            ("DISSERTATION", 1.0),
            ("PROPOSAL", 0.75),
            ("LASER", 0.5),
            ("MEETING", 0.25),
            ("ADMIN", 0.125),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            weights: ScoringWeights::default(),
            category_weights,
            default_category_weight: 0.0625,
            upcoming_window_days: 14,
        }
    }
}

/// Per-task prominence score
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriorityScore {
    pub task_id: TaskId,
    pub score: f64,
    pub prominence: VisualProminence,
    pub category_score: f64,
    pub milestone_score: f64,
    pub duration_score: f64,
    pub urgency: Option<Urgency>,
    pub display_rank: usize, // 1 = most prominent
}

/// Scores for a task list, kept in input order
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityRanking {
    pub scores: Vec<PriorityScore>,
}

impl PriorityRanking {
    pub fn get(&self, task_id: &str) -> Option<&PriorityScore> {
        self.scores.iter().find(|score| score.task_id == task_id)
    }

    pub fn prominence_of(&self, task_id: &str) -> Option<VisualProminence> {
        self.get(task_id).map(|score| score.prominence)
    }

    /// Scores sorted by display rank
    pub fn ranked(&self) -> Vec<&PriorityScore> {
        let mut ranked: Vec<_> = self.scores.iter().collect();
        ranked.sort_by_key(|score| score.display_rank);
        ranked
    }

    pub fn tier_counts(&self) -> BTreeMap<VisualProminence, usize> {
        let mut counts = BTreeMap::new();
        for score in &self.scores {
            *counts.entry(score.prominence).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> String {
        let counts = self.tier_counts();
        let count = |tier| counts.get(&tier).copied().unwrap_or(0);
        format!(
            "Priority Ranking:\n  Tasks: {}\n  Critical: {}, High: {}, Medium: {}, Low: {}, Minimal: {}",
            self.scores.len(),
            count(VisualProminence::Critical),
            count(VisualProminence::High),
            count(VisualProminence::Medium),
            count(VisualProminence::Low),
            count(VisualProminence::Minimal),
        )
    }
}

/// Scores tasks by category weight, milestone flag and duration
#[derive(Clone, Debug, Default)]
pub struct PriorityRanker {
    config: PriorityConfig,
}

impl PriorityRanker {
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    /// Create ranker with custom weights
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn config(&self) -> &PriorityConfig {
        &self.config
    }

    /// Score every task. `current_date` only feeds the urgency label.
    pub fn rank(&self, tasks: &[SpanningTask], current_date: Option<NaiveDate>) -> PriorityRanking {
        let mut scores: Vec<PriorityScore> = tasks
            .iter()
            .map(|spanning| self.score_task(&spanning.task, current_date))
            .collect();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .score
                .partial_cmp(&scores[a].score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, index) in order.into_iter().enumerate() {
            scores[index].display_rank = rank + 1;
        }

        let ranking = PriorityRanking { scores };
        info!("Ranked {} tasks by visual prominence", ranking.scores.len());
        ranking
    }

    /// Calculate the weighted score for one task
    pub fn score_task(&self, task: &Task, current_date: Option<NaiveDate>) -> PriorityScore {
        let category_score = self.calculate_category_score(task);
        let milestone_score = self.calculate_milestone_score(task);
        let duration_score = self.calculate_duration_score(task);

        let weights = &self.config.weights;
        let total_weight = weights.total();
        let score = if total_weight > 0.0 {
            (category_score * weights.category_weight
                + milestone_score * weights.milestone_weight
                + duration_score * weights.duration_weight)
                / total_weight
        } else {
            0.0
        };
        let score = score.clamp(0.0, 1.0);

        debug!(
            "Task {} scored {:.3} (category {:.2}, milestone {:.0}, duration {:.2})",
            task.id, score, category_score, milestone_score, duration_score
        );

        PriorityScore {
            task_id: task.id.clone(),
            score,
            prominence: VisualProminence::from_score(score),
            category_score,
            milestone_score,
            duration_score,
            urgency: current_date.map(|today| self.calculate_urgency(task, today)),
            display_rank: 0,
        }
    }

    fn calculate_category_score(&self, task: &Task) -> f64 {
        self.config
            .category_weights
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(task.category.trim()))
            .map(|(_, &weight)| weight)
            .unwrap_or(self.config.default_category_weight)
            .clamp(0.0, 1.0)
    }

    fn calculate_milestone_score(&self, task: &Task) -> f64 {
        if task.is_milestone { 1.0 } else { 0.0 }
    }

    /// Longer tasks dominate more of the calendar
    fn calculate_duration_score(&self, task: &Task) -> f64 {
        match task.elapsed_days() {
            days if days > 30 => 1.0,
            days if days > 7 => 2.0 / 3.0,
            days if days > 1 => 1.0 / 3.0,
            _ => 0.0,
        }
    }

    fn calculate_urgency(&self, task: &Task, today: NaiveDate) -> Urgency {
        if task.end_date < today {
            return match task.status {
                TaskStatus::Completed | TaskStatus::Cancelled => Urgency::Past,
                _ => Urgency::Overdue,
            };
        }
        if task.covers(today) {
            return Urgency::Active;
        }
        if (task.start_date - today).num_days() <= self.config.upcoming_window_days {
            Urgency::Upcoming
        } else {
            Urgency::Future
        }
    }
}
