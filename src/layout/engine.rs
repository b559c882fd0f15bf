//! Rule-driven stacking of overlap groups.
//!
//! [`StackingEngine::stack_tasks`] runs overlap analysis and priority ranking,
//! then lays every overlap group out top to bottom. Groups are placed one below
//! another, continuing from the height already used by stacks in the context.

use crate::layout::constraints::VisualConstraints;
use crate::layout::overlap::{ConflictSeverity, OverlapAnalysis, OverlapAnalyzer};
use crate::layout::priority::{PriorityRanker, PriorityRanking, VisualProminence};
use crate::layout::rules::{RuleFacts, RuleTable, StackingAction, StackingType};
use crate::task::{SpanningTask, TaskId};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Calendar range being laid out
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window covering one calendar month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next - Duration::days(1),
        })
    }

    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        !(end < self.start || self.end < start)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let span = (self.end - self.start).num_days() + 1;
        (0..span.max(0)).map(move |offset| start + Duration::days(offset))
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month_number(&self) -> u32 {
        self.start.month()
    }
}

/// Per-invocation inputs and analysis results
#[derive(Clone, Debug)]
pub struct StackingContext {
    pub window: Option<CalendarWindow>,
    pub current_date: Option<NaiveDate>,
    pub available_width: f64,
    pub available_height: f64,
    pub existing_stacks: Vec<TaskStack>,
    pub priorities: Option<PriorityRanking>,
    pub overlaps: Option<OverlapAnalysis>,
    pub constraints: VisualConstraints,
}

impl StackingContext {
    pub fn new(available_width: f64, available_height: f64, constraints: VisualConstraints) -> Self {
        Self {
            window: None,
            current_date: None,
            available_width,
            available_height,
            existing_stacks: Vec::new(),
            priorities: None,
            overlaps: None,
            constraints,
        }
    }

    pub fn with_window(mut self, window: CalendarWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_current_date(mut self, current_date: NaiveDate) -> Self {
        self.current_date = Some(current_date);
        self
    }

    /// Height consumed by stacks already placed
    pub fn placed_height(&self) -> f64 {
        self.existing_stacks.iter().map(|stack| stack.total_height).sum()
    }

    fn in_conflict(&self, task_id: &str) -> bool {
        self.overlaps
            .as_ref()
            .is_some_and(|analysis| analysis.is_conflicted(task_id))
    }

    fn prominence_of(&self, task_id: &str) -> Option<VisualProminence> {
        self.priorities
            .as_ref()
            .and_then(|ranking| ranking.prominence_of(task_id))
    }
}

/// A task with its resolved action and bounding box
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PositionedTask {
    pub task: SpanningTask,
    pub action: StackingAction,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub prominence: Option<VisualProminence>,
    pub collides: bool,
    pub overflows: bool,
}

impl PositionedTask {
    pub fn task_id(&self) -> &str {
        self.task.id()
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Area shared by the two boxes, zero when they only touch or are apart
    pub fn intersection_area(&self, other: &PositionedTask) -> f64 {
        let overlap_width = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_height = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if overlap_width <= 0.0 || overlap_height <= 0.0 {
            return 0.0;
        }
        overlap_width * overlap_height
    }

    /// Any intersection with positive area is a collision
    pub fn collides_with(&self, other: &PositionedTask) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// A collision covering more than `threshold` of the smaller box
    pub fn collides_severely_with(&self, other: &PositionedTask, threshold: f64) -> bool {
        let smaller = (self.width * self.height).min(other.width * other.height);
        self.intersection_area(other) > threshold * smaller
    }
}

/// One laid-out overlap group
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskStack {
    pub id: String,
    pub tasks: Vec<PositionedTask>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub stacking_type: StackingType,
    pub top: f64,
    pub total_height: f64,
    pub max_width: f64,
    pub max_severity: Option<ConflictSeverity>,
}

impl TaskStack {
    pub fn depth(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackingMetrics {
    pub total_tasks: usize,
    pub total_stacks: usize,
    pub collision_count: usize,
    pub severe_collision_count: usize,
    pub overflow_count: usize,
    pub space_efficiency: f64,
    pub visual_quality: f64,
    pub max_stack_depth: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackingResult {
    pub stacks: Vec<TaskStack>,
    pub metrics: StackingMetrics,
    pub recommendations: Vec<String>,
    pub skipped: Vec<TaskId>,
}

impl StackingResult {
    pub fn stacks_by_type(&self, stacking_type: StackingType) -> Vec<&TaskStack> {
        self.stacks
            .iter()
            .filter(|stack| stack.stacking_type == stacking_type)
            .collect()
    }

    pub fn positioned(&self, task_id: &str) -> Option<&PositionedTask> {
        self.stacks
            .iter()
            .flat_map(|stack| stack.tasks.iter())
            .find(|positioned| positioned.task_id() == task_id)
    }

    pub fn action_for(&self, task_id: &str) -> Option<&StackingAction> {
        self.positioned(task_id).map(|positioned| &positioned.action)
    }

    pub fn type_counts(&self) -> BTreeMap<StackingType, usize> {
        let mut counts = BTreeMap::new();
        for positioned in self.stacks.iter().flat_map(|stack| stack.tasks.iter()) {
            *counts.entry(positioned.action.stacking_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> String {
        let metrics = &self.metrics;
        format!(
            "Stacking Summary:\n  Total Stacks: {}\n  Tasks: {}\n  Collisions: {} ({} severe)\n  Overflows: {}\n  Space Efficiency: {:.2}%\n  Visual Quality: {:.2}%",
            metrics.total_stacks,
            metrics.total_tasks,
            metrics.collision_count,
            metrics.severe_collision_count,
            metrics.overflow_count,
            metrics.space_efficiency * 100.0,
            metrics.visual_quality * 100.0,
        )
    }
}

/// Stacking engine; one instance per generation run
#[derive(Clone, Debug, Default)]
pub struct StackingEngine {
    rules: RuleTable,
    analyzer: OverlapAnalyzer,
    ranker: PriorityRanker,
}

impl StackingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_ranker(mut self, ranker: PriorityRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    /// Resolve an action for every task and lay out each overlap group
    pub fn stack_tasks(&self, tasks: &[SpanningTask], context: &mut StackingContext) -> StackingResult {
        let mut skipped = Vec::new();
        let mut kept = Vec::with_capacity(tasks.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for task in tasks {
            if !task.task.has_valid_range() {
                warn!(
                    "Skipping task {}: end date precedes start date",
                    task.id()
                );
                skipped.push(task.id().to_string());
                continue;
            }
            if !seen.insert(task.id()) {
                warn!("Skipping task {} ('{}'): duplicate id", task.id(), task.task.name);
                skipped.push(task.id().to_string());
                continue;
            }
            if let Some(window) = &context.window
                && !window.intersects(task.start_date(), task.end_date())
            {
                debug!("Task {} lies outside the calendar window", task.id());
                continue;
            }
            kept.push(task.clone());
        }

        let analysis = self.analyzer.analyze(&kept);
        let ranking = self.ranker.rank(&kept, context.current_date);
        let by_id: HashMap<&str, &SpanningTask> = kept.iter().map(|task| (task.id(), task)).collect();

        let groups: Vec<(Vec<&SpanningTask>, Option<ConflictSeverity>)> = analysis
            .groups
            .iter()
            .map(|group| {
                let members = group
                    .tasks
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).copied())
                    .collect();
                (members, group.max_severity)
            })
            .collect();

        context.overlaps = Some(analysis);
        context.priorities = Some(ranking);

        let first_new = context.existing_stacks.len();
        for (members, max_severity) in groups {
            let stack = self.create_stack(&members, max_severity, context);
            debug!(
                "Created {} with {} tasks ({})",
                stack.id,
                stack.tasks.len(),
                stack.stacking_type
            );
            context.existing_stacks.push(stack);
        }

        let mut stacks: Vec<TaskStack> = context.existing_stacks[first_new..].to_vec();
        let constraints = &context.constraints;
        let overflow_limit = constraints.overflow_limit(context.available_height);
        let severe_collisions = Self::mark_collisions(&mut stacks, constraints.collision_threshold);
        for positioned in stacks.iter_mut().flat_map(|stack| stack.tasks.iter_mut()) {
            positioned.overflows = positioned.bottom() > overflow_limit;
        }
        context.existing_stacks.truncate(first_new);
        context.existing_stacks.extend(stacks.iter().cloned());

        let metrics = Self::calculate_metrics(&stacks, severe_collisions, context);
        let recommendations = Self::generate_recommendations(&metrics, context);

        info!(
            "Stacked {} tasks into {} stacks ({} collisions, {} overflows)",
            metrics.total_tasks, metrics.total_stacks, metrics.collision_count, metrics.overflow_count
        );

        StackingResult {
            stacks,
            metrics,
            recommendations,
            skipped,
        }
    }

    /// Place a group's tasks in start order below everything already placed
    fn create_stack(
        &self,
        members: &[&SpanningTask],
        max_severity: Option<ConflictSeverity>,
        context: &StackingContext,
    ) -> TaskStack {
        let top = context.placed_height();
        let spacing = context.constraints.vertical_spacing;
        let overflow_limit = context.constraints.overflow_limit(context.available_height);

        let mut cursor = top;
        let mut tasks = Vec::with_capacity(members.len());
        for task in members {
            let would_overflow =
                cursor + context.constraints.min_task_height + spacing > overflow_limit;
            let facts = RuleFacts {
                task: &task.task,
                in_conflict: context.in_conflict(task.id()),
                would_overflow,
                prominence: context.prominence_of(task.id()),
            };
            let action = self.rules.evaluate(&facts, &context.constraints);

            let y = (cursor + action.vertical_offset).max(top);
            cursor = y + action.height + spacing;
            tasks.push(PositionedTask {
                task: (*task).clone(),
                x: action.horizontal_offset,
                y,
                width: action.width,
                height: action.height,
                prominence: facts.prominence,
                collides: false,
                overflows: false,
                action,
            });
        }

        let start_date = members
            .iter()
            .map(|task| task.start_date())
            .min()
            .unwrap_or_default();
        let end_date = members
            .iter()
            .map(|task| task.end_date())
            .max()
            .unwrap_or_default();
        let max_width = tasks.iter().map(|t| t.width).fold(0.0, f64::max);
        let stacking_type = Self::determine_stack_type(&tasks);

        TaskStack {
            id: format!("stack_{}", context.existing_stacks.len() + 1),
            tasks,
            start_date,
            end_date,
            stacking_type,
            top,
            total_height: cursor - top,
            max_width,
            max_severity,
        }
    }

    /// Floating or cascading members dominate; otherwise the majority type wins
    fn determine_stack_type(tasks: &[PositionedTask]) -> StackingType {
        if let Some(special) = tasks.iter().map(|t| t.action.stacking_type).find(|kind| {
            matches!(kind, StackingType::Floating | StackingType::Cascading)
        }) {
            return special;
        }

        let share = |kind: StackingType| {
            tasks.iter().filter(|t| t.action.stacking_type == kind).count() as f64
                / tasks.len().max(1) as f64
        };
        if share(StackingType::Horizontal) > 0.5 {
            StackingType::Horizontal
        } else if share(StackingType::Minimized) > 0.5 {
            StackingType::Minimized
        } else {
            StackingType::Vertical
        }
    }

    /// Flag every task whose box collides with one placed before it and
    /// return how many of those collisions exceed `threshold`
    fn mark_collisions(stacks: &mut [TaskStack], threshold: f64) -> usize {
        let boxes: Vec<PositionedTask> = stacks
            .iter()
            .flat_map(|stack| stack.tasks.iter().cloned())
            .collect();
        let mut severe = 0;
        let flags: Vec<bool> = boxes
            .iter()
            .enumerate()
            .map(|(i, current)| {
                let earlier = &boxes[..i];
                if earlier
                    .iter()
                    .any(|other| current.collides_severely_with(other, threshold))
                {
                    severe += 1;
                }
                earlier.iter().any(|other| current.collides_with(other))
            })
            .collect();

        for (positioned, collides) in stacks
            .iter_mut()
            .flat_map(|stack| stack.tasks.iter_mut())
            .zip(flags)
        {
            positioned.collides = collides;
        }
        severe
    }

    fn calculate_metrics(
        stacks: &[TaskStack],
        severe_collision_count: usize,
        context: &StackingContext,
    ) -> StackingMetrics {
        let positioned = || stacks.iter().flat_map(|stack| stack.tasks.iter());
        let total_tasks = positioned().count();
        let collision_count = positioned().filter(|t| t.collides).count();
        let overflow_count = positioned().filter(|t| t.overflows).count();

        let used: f64 = stacks.iter().map(|stack| stack.total_height).sum();
        let space_efficiency = if context.available_height > 0.0 {
            (used / context.available_height).min(1.0)
        } else {
            0.0
        };

        let visual_quality = if total_tasks == 0 {
            1.0
        } else {
            let n = total_tasks as f64;
            (1.0 - collision_count as f64 / n - overflow_count as f64 / n).max(0.0)
        };

        StackingMetrics {
            total_tasks,
            total_stacks: stacks.len(),
            collision_count,
            severe_collision_count,
            overflow_count,
            space_efficiency,
            visual_quality,
            max_stack_depth: stacks.iter().map(TaskStack::depth).max().unwrap_or(0),
        }
    }

    fn generate_recommendations(metrics: &StackingMetrics, context: &StackingContext) -> Vec<String> {
        let mut recommendations = Vec::new();

        if metrics.collision_count > 0 {
            recommendations.push(format!(
                "{} visual collisions detected - consider adjusting task positioning",
                metrics.collision_count
            ));
        }
        if metrics.overflow_count > 0 {
            recommendations.push(format!(
                "{} overflow issues detected - consider reducing task sizes or using minimization",
                metrics.overflow_count
            ));
        }
        if metrics.total_tasks > 0 {
            if metrics.space_efficiency < 0.5 {
                recommendations.push("Low space efficiency - consider optimizing task layouts".to_string());
            } else if metrics.space_efficiency > 0.9 {
                recommendations.push("High space efficiency - good use of available space".to_string());
            }
        }
        if metrics.visual_quality < 0.7 {
            recommendations
                .push("Visual quality could be improved - consider adjusting stacking rules".to_string());
        }
        if metrics.max_stack_depth > context.constraints.max_stack_depth {
            warn!(
                "Stack depth {} exceeds maximum {}",
                metrics.max_stack_depth, context.constraints.max_stack_depth
            );
            recommendations.push(format!(
                "Stack depth ({}) exceeds recommended maximum ({}) - consider task grouping",
                metrics.max_stack_depth, context.constraints.max_stack_depth
            ));
        }

        recommendations
    }
}
