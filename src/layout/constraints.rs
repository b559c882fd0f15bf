use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric bounds every layout decision is made against
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct VisualConstraints {
    pub max_stack_height: f64,
    pub min_task_height: f64,
    pub max_task_height: f64,
    pub min_task_width: f64,
    pub max_task_width: f64,
    pub vertical_spacing: f64,
    pub horizontal_spacing: f64,
    pub max_stack_depth: usize,
    pub collision_threshold: f64, // fraction of the smaller box that must intersect
    pub overflow_threshold: f64,  // fraction of available height before overflow
}

impl Default for VisualConstraints {
    fn default() -> Self {
        Self {
            max_stack_height: 100.0,
            min_task_height: 20.0,
            max_task_height: 40.0,
            min_task_width: 50.0,
            max_task_width: 200.0,
            vertical_spacing: 2.0,
            horizontal_spacing: 5.0,
            max_stack_depth: 10,
            collision_threshold: 0.1,
            overflow_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for '{field}': {reason}")]
pub struct ConstraintViolation {
    pub field: &'static str,
    pub reason: String,
}

impl ConstraintViolation {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl VisualConstraints {
    /// Check bounds ordering and value ranges, reporting the first problem found
    pub fn validate(&self) -> Result<(), ConstraintViolation> {
        let dimensions = [
            ("max_stack_height", self.max_stack_height),
            ("min_task_height", self.min_task_height),
            ("max_task_height", self.max_task_height),
            ("min_task_width", self.min_task_width),
            ("max_task_width", self.max_task_width),
            ("vertical_spacing", self.vertical_spacing),
            ("horizontal_spacing", self.horizontal_spacing),
        ];
        for (field, value) in dimensions {
            if !value.is_finite() || value < 0.0 {
                return Err(ConstraintViolation::new(
                    field,
                    format!("must be a non-negative number, got {}", value),
                ));
            }
        }

        if self.min_task_height > self.max_task_height {
            return Err(ConstraintViolation::new(
                "min_task_height",
                format!(
                    "{} exceeds max_task_height {}",
                    self.min_task_height, self.max_task_height
                ),
            ));
        }
        if self.min_task_width > self.max_task_width {
            return Err(ConstraintViolation::new(
                "min_task_width",
                format!(
                    "{} exceeds max_task_width {}",
                    self.min_task_width, self.max_task_width
                ),
            ));
        }
        if self.max_stack_depth == 0 {
            return Err(ConstraintViolation::new(
                "max_stack_depth",
                "must be at least 1",
            ));
        }

        for (field, value) in [
            ("collision_threshold", self.collision_threshold),
            ("overflow_threshold", self.overflow_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConstraintViolation::new(
                    field,
                    format!("must be within (0, 1], got {}", value),
                ));
            }
        }

        Ok(())
    }

    /// Height at which a stack starts to overflow the given area
    pub fn overflow_limit(&self, available_height: f64) -> f64 {
        available_height * self.overflow_threshold
    }
}
