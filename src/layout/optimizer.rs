//! Vertical stacks and the space optimizer.
//!
//! Each laid-out overlap group becomes a [`VerticalStack`] of natural heights
//! from the [`HeightCalculator`]. The [`SpaceOptimizer`] then scales the stack to
//! fit (compression) or fill (expansion) the available height. Scaling always
//! starts from the natural heights, so optimizing twice gives the same stack.

use crate::layout::engine::{StackingContext, StackingResult, TaskStack};
use crate::layout::sizing::{
    Alignment, ContentComplexity, Distribution, HeightCalculator, PlacementInput, PositionCalculator,
};
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SpaceOptimizerConfig {
    pub compression_threshold: f64,
    pub expansion_threshold: f64,
    pub max_expansion: f64,
}

impl Default for SpaceOptimizerConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 0.8,
            expansion_threshold: 0.6,
            max_expansion: 1.5,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScaleState {
    Natural,
    Compressed,
    Expanded,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerticalEntry {
    pub task_id: TaskId,
    pub complexity: ContentComplexity,
    pub is_milestone: bool,
    pub natural_height: f64,
    pub height: f64,
    pub y: f64,
    pub visual_weight: f64,
}

impl VerticalEntry {
    fn placement(&self, height: f64) -> PlacementInput {
        PlacementInput {
            height,
            complexity: self.complexity,
            is_milestone: self.is_milestone,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerticalStack {
    pub stack_id: String,
    pub entries: Vec<VerticalEntry>,
    pub alignment: Alignment,
    pub distribution: Distribution,
    pub spacing: f64,
    pub scale_state: ScaleState,
    pub scale_factor: f64,
    pub total_height: f64, // content height before alignment shift
}

impl VerticalStack {
    fn placements(&self, natural: bool) -> Vec<PlacementInput> {
        self.entries
            .iter()
            .map(|entry| entry.placement(if natural { entry.natural_height } else { entry.height }))
            .collect()
    }

    pub fn height_of(&self, task_id: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.task_id == task_id)
            .map(|entry| entry.height)
    }

    pub fn space_efficiency(&self, available_height: f64) -> f64 {
        if available_height <= 0.0 {
            return 0.0;
        }
        (self.total_height / available_height).min(1.0)
    }

    /// 1.0 when all entries weigh the same; drops 0.1 per unit of relative deviation
    pub fn visual_balance(&self) -> f64 {
        if self.entries.is_empty() {
            return 1.0;
        }
        let average = self.entries.iter().map(|e| e.visual_weight).sum::<f64>()
            / self.entries.len() as f64;
        if average <= 0.0 {
            return 1.0;
        }
        let deviation: f64 = self
            .entries
            .iter()
            .map(|e| (e.visual_weight - average).abs() / average)
            .sum();
        (1.0 - deviation * 0.1).max(0.0)
    }
}

/// Proportional height scaling of whole stacks
#[derive(Clone, Debug, Default)]
pub struct SpaceOptimizer {
    config: SpaceOptimizerConfig,
    positions: PositionCalculator,
}

impl SpaceOptimizer {
    pub fn new(config: SpaceOptimizerConfig, positions: PositionCalculator) -> Self {
        Self { config, positions }
    }

    /// Scale factor for a stack whose natural height is `natural_total`
    pub fn scale_for(&self, natural_total: f64, available_height: f64) -> (ScaleState, f64) {
        if available_height <= 0.0 || natural_total <= 0.0 {
            return (ScaleState::Natural, 1.0);
        }
        if natural_total > available_height * self.config.compression_threshold {
            (ScaleState::Compressed, available_height / natural_total)
        } else if natural_total < available_height * self.config.expansion_threshold {
            (
                ScaleState::Expanded,
                self.config.max_expansion.min(available_height / natural_total),
            )
        } else {
            (ScaleState::Natural, 1.0)
        }
    }

    /// Compress or expand the stack and recompute positions top-down
    pub fn optimize(&self, stack: &mut VerticalStack, available_height: f64) {
        let natural = stack.placements(true);
        let natural_total = self
            .positions
            .stack_height(&natural, stack.spacing, stack.distribution);
        let (state, factor) = self.scale_for(natural_total, available_height);

        for entry in &mut stack.entries {
            entry.height = entry.natural_height * factor;
        }
        stack.scale_state = state;
        stack.scale_factor = factor;
        self.relayout(stack, available_height);

        debug!(
            "Optimized {}: {:?} by {:.3} to height {:.1}",
            stack.stack_id, state, factor, stack.total_height
        );
    }

    /// Recompute entry positions from current heights
    pub fn relayout(&self, stack: &mut VerticalStack, available_height: f64) {
        let placements = stack.placements(false);
        let positions = self.positions.positions(
            &placements,
            stack.spacing,
            stack.alignment,
            stack.distribution,
            available_height,
        );
        for (entry, y) in stack.entries.iter_mut().zip(positions) {
            entry.y = y;
        }
        stack.total_height = self
            .positions
            .stack_height(&placements, stack.spacing, stack.distribution);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerticalStackingResult {
    pub stacks: Vec<VerticalStack>,
    pub total_height: f64,
    pub space_efficiency: f64,
    pub visual_balance: f64,
    pub compression_ratio: f64, // share of entries that were compressed
    pub recommendations: Vec<String>,
}

impl VerticalStackingResult {
    /// Final height of a task, keyed by id
    pub fn heights(&self) -> HashMap<TaskId, f64> {
        self.stacks
            .iter()
            .flat_map(|stack| stack.entries.iter())
            .map(|entry| (entry.task_id.clone(), entry.height))
            .collect()
    }

    pub fn height_of(&self, task_id: &str) -> Option<f64> {
        self.stacks.iter().find_map(|stack| stack.height_of(task_id))
    }

    pub fn stacks_by_alignment(&self, alignment: Alignment) -> Vec<&VerticalStack> {
        self.stacks.iter().filter(|s| s.alignment == alignment).collect()
    }

    pub fn stacks_by_distribution(&self, distribution: Distribution) -> Vec<&VerticalStack> {
        self.stacks
            .iter()
            .filter(|s| s.distribution == distribution)
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Vertical Stacking Summary:\n  Stacks: {}\n  Total Height: {:.1}\n  Space Efficiency: {:.2}%\n  Visual Balance: {:.2}\n  Compressed Entries: {:.0}%",
            self.stacks.len(),
            self.total_height,
            self.space_efficiency * 100.0,
            self.visual_balance,
            self.compression_ratio * 100.0,
        )
    }
}

/// Converts laid-out stacks into optimized vertical stacks
#[derive(Clone, Debug, Default)]
pub struct VerticalStacker {
    heights: HeightCalculator,
    positions: PositionCalculator,
    optimizer: SpaceOptimizer,
}

impl VerticalStacker {
    pub fn new(heights: HeightCalculator, positions: PositionCalculator, optimizer: SpaceOptimizer) -> Self {
        Self {
            heights,
            positions,
            optimizer,
        }
    }

    pub fn build(&self, stack: &TaskStack, context: &StackingContext) -> VerticalStack {
        let entries: Vec<VerticalEntry> = stack
            .tasks
            .iter()
            .map(|positioned| {
                let task = &positioned.task.task;
                let natural_height = self.heights.natural_height(task, &context.constraints);
                VerticalEntry {
                    task_id: task.id.clone(),
                    complexity: self.heights.complexity(task),
                    is_milestone: task.is_milestone,
                    natural_height,
                    height: natural_height,
                    y: 0.0,
                    visual_weight: self.heights.visual_weight(task),
                }
            })
            .collect();

        let placements: Vec<PlacementInput> = entries.iter().map(|e| e.placement(e.height)).collect();
        let mut vertical = VerticalStack {
            stack_id: stack.id.clone(),
            alignment: self
                .positions
                .determine_alignment(&placements, context.available_height),
            distribution: self.positions.determine_distribution(&placements),
            spacing: context.constraints.vertical_spacing,
            scale_state: ScaleState::Natural,
            scale_factor: 1.0,
            total_height: 0.0,
            entries,
        };
        self.optimizer.optimize(&mut vertical, context.available_height);
        vertical
    }

    pub fn stack_vertically(&self, result: &StackingResult, context: &StackingContext) -> VerticalStackingResult {
        let stacks: Vec<VerticalStack> = result
            .stacks
            .iter()
            .map(|stack| self.build(stack, context))
            .collect();

        let total_height = stacks.iter().map(|s| s.total_height).sum::<f64>();
        let space_efficiency = if context.available_height > 0.0 {
            (total_height / context.available_height).min(1.0)
        } else {
            0.0
        };
        let visual_balance = if stacks.is_empty() {
            1.0
        } else {
            stacks.iter().map(VerticalStack::visual_balance).sum::<f64>() / stacks.len() as f64
        };
        let entry_count: usize = stacks.iter().map(|s| s.entries.len()).sum();
        let compressed: usize = stacks
            .iter()
            .filter(|s| s.scale_state == ScaleState::Compressed)
            .map(|s| s.entries.len())
            .sum();
        let compression_ratio = if entry_count == 0 {
            0.0
        } else {
            compressed as f64 / entry_count as f64
        };

        let mut recommendations = Vec::new();
        if compression_ratio > 0.5 {
            recommendations.push(
                "Most stacks needed compression - consider a larger cell height".to_string(),
            );
        }
        if visual_balance < 0.7 {
            recommendations.push(
                "Unbalanced stacks - task weights vary widely within groups".to_string(),
            );
        }

        VerticalStackingResult {
            stacks,
            total_height,
            space_efficiency,
            visual_balance,
            compression_ratio,
            recommendations,
        }
    }
}
