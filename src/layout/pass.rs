use crate::layout::constraints::VisualConstraints;
use crate::layout::engine::{CalendarWindow, StackingContext, StackingEngine, StackingResult};
use crate::layout::optimizer::{VerticalStacker, VerticalStackingResult};
use crate::layout::stacker::TaskStacker;
use crate::task::{Task, spanning_tasks};
use chrono::{NaiveDate, Weekday};
use tracing::info;

/// Everything one generation run produces
pub struct LayoutOutput {
    pub stacker: TaskStacker,
    pub stacking: StackingResult,
    pub vertical: VerticalStackingResult,
    pub context: StackingContext,
}

/// Full pipeline: spanning tasks, track assignment, rule-based stacking and
/// space optimization. Holds no state between runs.
#[derive(Clone, Debug)]
pub struct LayoutPass {
    engine: StackingEngine,
    vertical: VerticalStacker,
    constraints: VisualConstraints,
    week_start: Weekday,
    available_width: f64,
    available_height: f64,
}

impl Default for LayoutPass {
    fn default() -> Self {
        Self::new(VisualConstraints::default())
    }
}

impl LayoutPass {
    pub fn new(constraints: VisualConstraints) -> Self {
        Self {
            engine: StackingEngine::new(),
            vertical: VerticalStacker::default(),
            available_width: constraints.max_task_width,
            available_height: constraints.max_stack_height,
            constraints,
            week_start: Weekday::Mon,
        }
    }

    pub fn with_engine(mut self, engine: StackingEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_vertical_stacker(mut self, vertical: VerticalStacker) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_available_area(mut self, width: f64, height: f64) -> Self {
        self.available_width = width;
        self.available_height = height;
        self
    }

    pub fn constraints(&self) -> &VisualConstraints {
        &self.constraints
    }

    pub fn run(
        &self,
        tasks: Vec<Task>,
        window: Option<CalendarWindow>,
        current_date: Option<NaiveDate>,
    ) -> LayoutOutput {
        let spanning = spanning_tasks(tasks);

        let mut stacker = TaskStacker::new(spanning.clone()).with_week_start(self.week_start);
        stacker.compute_stacks();

        let mut context = StackingContext::new(
            self.available_width,
            self.available_height,
            self.constraints.clone(),
        );
        context.window = window;
        context.current_date = current_date;

        let stacking = self.engine.stack_tasks(&spanning, &mut context);
        let vertical = self.vertical.stack_vertically(&stacking, &context);

        info!(
            "Layout pass complete: {} tasks, {} tracks, {} stacks",
            spanning.len(),
            stacker.max_tracks(),
            stacking.stacks.len()
        );

        LayoutOutput {
            stacker,
            stacking,
            vertical,
            context,
        }
    }
}
