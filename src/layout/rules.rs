//! Stacking rules as data.
//!
//! A rule pairs a [`RuleCondition`] with an [`ActionTemplate`]. The table is
//! evaluated in order and the first matching rule decides the task's treatment.

use crate::layout::constraints::VisualConstraints;
use crate::layout::priority::VisualProminence;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout treatment for a task
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StackingType {
    Vertical,
    Horizontal,
    Cascading,
    Floating,
    Minimized,
}

impl fmt::Display for StackingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::Cascading => "cascading",
            Self::Floating => "floating",
            Self::Minimized => "minimized",
        };
        write!(f, "{}", name)
    }
}

/// Facts about a task at the moment it is placed
#[derive(Debug, Clone, Copy)]
pub struct RuleFacts<'a> {
    pub task: &'a Task,
    pub in_conflict: bool,
    pub would_overflow: bool,
    pub prominence: Option<VisualProminence>,
}

/// Predicate half of a rule
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    Milestone,
    InConflict,
    /// Elapsed days strictly greater than the bound
    LongDuration { min_elapsed_days: i64 },
    /// Elapsed days at most the bound
    ShortDuration { max_elapsed_days: i64 },
    WouldOverflow,
    CategoryIn { categories: Vec<String> },
    ProminenceAtLeast { prominence: VisualProminence },
    Always,
}

impl RuleCondition {
    pub fn matches(&self, facts: &RuleFacts<'_>) -> bool {
        match self {
            Self::Milestone => facts.task.is_milestone,
            Self::InConflict => facts.in_conflict,
            Self::LongDuration { min_elapsed_days } => {
                facts.task.elapsed_days() > *min_elapsed_days
            }
            Self::ShortDuration { max_elapsed_days } => {
                facts.task.elapsed_days() <= *max_elapsed_days
            }
            Self::WouldOverflow => facts.would_overflow,
            Self::CategoryIn { categories } => categories
                .iter()
                .any(|category| category.eq_ignore_ascii_case(facts.task.category.trim())),
            Self::ProminenceAtLeast { prominence } => {
                facts.prominence.is_some_and(|actual| actual >= *prominence)
            }
            Self::Always => true,
        }
    }
}

/// A dimension expressed relative to the visual constraints
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SizeSpec {
    Min,
    Max,
    FractionOfMin(f64),
    FractionOfMax(f64),
    Fixed(f64),
}

impl SizeSpec {
    fn resolve(&self, min: f64, max: f64) -> f64 {
        match *self {
            Self::Min => min,
            Self::Max => max,
            Self::FractionOfMin(fraction) => min * fraction,
            Self::FractionOfMax(fraction) => max * fraction,
            Self::Fixed(value) => value,
        }
    }
}

/// Action half of a rule, resolved against constraints at evaluation time
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActionTemplate {
    pub stacking_type: StackingType,
    pub height: SizeSpec,
    pub width: SizeSpec,
    pub z_index: i32,
    #[serde(default)]
    pub vertical_offset: f64,
    #[serde(default)]
    pub horizontal_offset: f64,
    #[serde(default)]
    pub collision_avoidance: bool,
}

impl ActionTemplate {
    pub fn resolve(&self, rule_name: &str, constraints: &VisualConstraints) -> StackingAction {
        StackingAction {
            stacking_type: self.stacking_type,
            height: self
                .height
                .resolve(constraints.min_task_height, constraints.max_task_height),
            width: self
                .width
                .resolve(constraints.min_task_width, constraints.max_task_width),
            z_index: self.z_index,
            vertical_offset: self.vertical_offset,
            horizontal_offset: self.horizontal_offset,
            collision_avoidance: self.collision_avoidance,
            rule: rule_name.to_string(),
        }
    }
}

/// Resolved visual treatment for one task
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackingAction {
    pub stacking_type: StackingType,
    pub height: f64,
    pub width: f64,
    pub z_index: i32,
    pub vertical_offset: f64,
    pub horizontal_offset: f64,
    pub collision_avoidance: bool,
    pub rule: String, // name of the rule that produced it
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StackingRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: RuleCondition,
    pub action: ActionTemplate,
}

impl StackingRule {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        condition: RuleCondition,
        action: ActionTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            condition,
            action,
        }
    }
}

/// Name of the rule that always matches
pub const DEFAULT_RULE_NAME: &str = "default";

/// The built-in rule order
pub fn default_rules() -> Vec<StackingRule> {
    vec![
        StackingRule::new(
            "milestone",
            "Milestones float above everything else at full size",
            RuleCondition::Milestone,
            ActionTemplate {
                stacking_type: StackingType::Floating,
                height: SizeSpec::Max,
                width: SizeSpec::Max,
                z_index: 9,
                vertical_offset: 0.0,
                horizontal_offset: 0.0,
                collision_avoidance: true,
            },
        ),
        StackingRule::new(
            "conflict",
            "Overlapping tasks cascade with a small offset",
            RuleCondition::InConflict,
            ActionTemplate {
                stacking_type: StackingType::Cascading,
                height: SizeSpec::FractionOfMax(0.8),
                width: SizeSpec::FractionOfMax(0.8),
                z_index: 7,
                vertical_offset: 5.0,
                horizontal_offset: 5.0,
                collision_avoidance: true,
            },
        ),
        StackingRule::new(
            "long_duration",
            "Tasks longer than a week run horizontally",
            RuleCondition::LongDuration {
                min_elapsed_days: 7,
            },
            ActionTemplate {
                stacking_type: StackingType::Horizontal,
                height: SizeSpec::Min,
                width: SizeSpec::Max,
                z_index: 5,
                vertical_offset: 0.0,
                horizontal_offset: 0.0,
                collision_avoidance: false,
            },
        ),
        StackingRule::new(
            "short_duration",
            "Tasks of a day or less stack compactly",
            RuleCondition::ShortDuration {
                max_elapsed_days: 1,
            },
            ActionTemplate {
                stacking_type: StackingType::Vertical,
                height: SizeSpec::Min,
                width: SizeSpec::Min,
                z_index: 3,
                vertical_offset: 0.0,
                horizontal_offset: 0.0,
                collision_avoidance: false,
            },
        ),
        StackingRule::new(
            "overflow",
            "Tasks that would overflow the area are minimized",
            RuleCondition::WouldOverflow,
            ActionTemplate {
                stacking_type: StackingType::Minimized,
                height: SizeSpec::FractionOfMin(0.5),
                width: SizeSpec::FractionOfMin(0.5),
                z_index: 1,
                vertical_offset: 0.0,
                horizontal_offset: 0.0,
                collision_avoidance: false,
            },
        ),
        default_rule(),
    ]
}

fn default_rule() -> StackingRule {
    StackingRule::new(
        DEFAULT_RULE_NAME,
        "Plain vertical stacking",
        RuleCondition::Always,
        ActionTemplate {
            stacking_type: StackingType::Vertical,
            height: SizeSpec::Min,
            width: SizeSpec::Min,
            z_index: 2,
            vertical_offset: 0.0,
            horizontal_offset: 0.0,
            collision_avoidance: false,
        },
    )
}

/// Ordered, first-match-wins rule table
#[derive(Clone, Debug, PartialEq)]
pub struct RuleTable {
    rules: Vec<StackingRule>,
    fallback: StackingRule,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleTable {
    /// Build a table; tables without a catch-all fall back to plain vertical stacking
    pub fn new(rules: Vec<StackingRule>) -> Self {
        Self {
            rules,
            fallback: default_rule(),
        }
    }

    pub fn rules(&self) -> &[StackingRule] {
        &self.rules
    }

    /// Insert a rule ahead of the catch-all rule, or at the end if there is none
    pub fn add_rule(&mut self, rule: StackingRule) {
        let position = self
            .rules
            .iter()
            .position(|existing| existing.condition == RuleCondition::Always)
            .unwrap_or(self.rules.len());
        self.rules.insert(position, rule);
    }

    pub fn evaluate(&self, facts: &RuleFacts<'_>, constraints: &VisualConstraints) -> StackingAction {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.condition.matches(facts))
            .unwrap_or(&self.fallback);
        rule.action.resolve(&rule.name, constraints)
    }
}
