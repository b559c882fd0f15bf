use crate::layout::constraints::VisualConstraints;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much text a task bar has to carry
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentComplexity {
    Minimal,
    Normal,
    Complex,
}

/// Multipliers applied per duration bucket
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DurationMultipliers {
    pub short: f64,  // <= 1 elapsed day
    pub medium: f64, // <= 7 elapsed days
    pub long: f64,
}

impl Default for DurationMultipliers {
    fn default() -> Self {
        Self {
            short: 1.0,
            medium: 1.0,
            long: 1.2,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ContentMultipliers {
    pub minimal: f64,
    pub normal: f64,
    pub complex: f64,
}

impl Default for ContentMultipliers {
    fn default() -> Self {
        Self {
            minimal: 1.0,
            normal: 1.0,
            complex: 1.3,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HeightConfig {
    pub base_height: f64,
    pub duration_multipliers: DurationMultipliers,
    pub content_multipliers: ContentMultipliers,
    /// Categories whose tasks always count as complex content
    pub high_significance_categories: Vec<String>,
    pub complex_name_length: usize, // names longer than this are complex
    pub minimal_name_length: usize, // names shorter than this are minimal
    /// Extra visual weight per category
    pub category_visual_weights: BTreeMap<String, f64>,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            base_height: 20.0,
            duration_multipliers: DurationMultipliers::default(),
            content_multipliers: ContentMultipliers::default(),
            high_significance_categories: vec!["DISSERTATION".to_string(), "PROPOSAL".to_string()],
            complex_name_length: 30,
            minimal_name_length: 10,
            category_visual_weights: [("DISSERTATION", 2.0), ("PROPOSAL", 1.5), ("LASER", 1.0)]
                .into_iter()
                .map(|(name, weight)| (name.to_string(), weight))
                .collect(),
        }
    }
}

/// Natural bar heights from duration and content complexity
#[derive(Clone, Debug, Default)]
pub struct HeightCalculator {
    config: HeightConfig,
}

impl HeightCalculator {
    pub fn new(config: HeightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeightConfig {
        &self.config
    }

    /// `base × duration multiplier × content multiplier`, clamped to the
    /// constraints' task height bounds
    pub fn natural_height(&self, task: &Task, constraints: &VisualConstraints) -> f64 {
        let durations = &self.config.duration_multipliers;
        let duration_multiplier = match task.elapsed_days() {
            days if days <= 1 => durations.short,
            days if days <= 7 => durations.medium,
            _ => durations.long,
        };

        let contents = &self.config.content_multipliers;
        let content_multiplier = match self.complexity(task) {
            ContentComplexity::Minimal => contents.minimal,
            ContentComplexity::Normal => contents.normal,
            ContentComplexity::Complex => contents.complex,
        };

        let height = self.config.base_height * duration_multiplier * content_multiplier;
        height
            .max(constraints.min_task_height)
            .min(constraints.max_task_height)
    }

    pub fn complexity(&self, task: &Task) -> ContentComplexity {
        let name_length = task.name.chars().count();
        let significant = self
            .config
            .high_significance_categories
            .iter()
            .any(|category| category.eq_ignore_ascii_case(task.category.trim()));

        if task.is_milestone || significant || name_length > self.config.complex_name_length {
            ContentComplexity::Complex
        } else if name_length < self.config.minimal_name_length {
            ContentComplexity::Minimal
        } else {
            ContentComplexity::Normal
        }
    }

    /// Relative visual weight, used for stack balance
    pub fn visual_weight(&self, task: &Task) -> f64 {
        let mut weight = 1.0 + task.duration_hours() * 0.01;
        weight += self
            .config
            .category_visual_weights
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(task.category.trim()))
            .map(|(_, &extra)| extra)
            .unwrap_or(0.0);
        if task.is_milestone {
            weight += 3.0;
        }
        weight
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Top,
    Center,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Even,
    Content,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PositionConfig {
    pub estimated_task_height: f64, // per-task estimate used to pick an alignment
    pub center_fill_ratio: f64,     // center when the estimate is below this share of the area
    pub complex_nudge: f64,         // extra gap above complex tasks
    pub minimal_nudge: f64,         // gap removed above minimal tasks
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            estimated_task_height: 25.0,
            center_fill_ratio: 0.5,
            complex_nudge: 5.0,
            minimal_nudge: 2.0,
        }
    }
}

/// Entry handed to the position calculator
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementInput {
    pub height: f64,
    pub complexity: ContentComplexity,
    pub is_milestone: bool,
}

/// Top-down placement with alignment and distribution policies
#[derive(Clone, Debug, Default)]
pub struct PositionCalculator {
    config: PositionConfig,
}

impl PositionCalculator {
    pub fn new(config: PositionConfig) -> Self {
        Self { config }
    }

    /// Milestone stacks stay top-aligned; sparse stacks are centered
    pub fn determine_alignment(&self, entries: &[PlacementInput], available_height: f64) -> Alignment {
        if entries.iter().any(|entry| entry.is_milestone) {
            return Alignment::Top;
        }
        let estimated = entries.len() as f64 * self.config.estimated_task_height;
        if available_height > 0.0 && estimated < available_height * self.config.center_fill_ratio {
            Alignment::Center
        } else {
            Alignment::Top
        }
    }

    /// Content-aware distribution only when complex and minimal tasks are mixed
    pub fn determine_distribution(&self, entries: &[PlacementInput]) -> Distribution {
        let has_complex = entries
            .iter()
            .any(|entry| entry.complexity == ContentComplexity::Complex);
        let has_minimal = entries
            .iter()
            .any(|entry| entry.complexity == ContentComplexity::Minimal);
        if has_complex && has_minimal {
            Distribution::Content
        } else {
            Distribution::Even
        }
    }

    /// Gap placed above the entry at `index`
    fn gap_above(&self, index: usize, entry: &PlacementInput, spacing: f64, distribution: Distribution) -> f64 {
        let base = if index == 0 { 0.0 } else { spacing };
        match (distribution, entry.complexity) {
            (Distribution::Content, ContentComplexity::Complex) => base + self.config.complex_nudge,
            (Distribution::Content, ContentComplexity::Minimal) => {
                (base - self.config.minimal_nudge).max(0.0)
            }
            _ => base,
        }
    }

    /// Total height the entries occupy when stacked without alignment
    pub fn stack_height(&self, entries: &[PlacementInput], spacing: f64, distribution: Distribution) -> f64 {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.gap_above(index, entry, spacing, distribution) + entry.height)
            .sum()
    }

    /// Y offset of every entry; each starts below the previous bottom plus its gap
    pub fn positions(
        &self,
        entries: &[PlacementInput],
        spacing: f64,
        alignment: Alignment,
        distribution: Distribution,
        available_height: f64,
    ) -> Vec<f64> {
        let mut cursor = 0.0;
        let mut positions: Vec<f64> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let y = cursor + self.gap_above(index, entry, spacing, distribution);
                cursor = y + entry.height;
                y
            })
            .collect();

        if alignment == Alignment::Center && available_height > cursor {
            let shift = (available_height - cursor) / 2.0;
            positions.iter_mut().for_each(|y| *y += shift);
        }

        positions
    }
}
