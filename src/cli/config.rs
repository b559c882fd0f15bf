//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit file: `$PLANNER_LAYOUT_CONFIG`
//! 2. Current directory: ./planner.toml or ./.planner/config.toml
//! 3. User config: ~/.planner/config.toml
//! 4. System config: /etc/planner/config.toml
//! 5. Built-in defaults

use crate::env;
use crate::layout::{
    ConstraintViolation, HeightCalculator, HeightConfig, LayoutPass, PositionCalculator,
    PositionConfig, PriorityConfig, PriorityRanker, RuleTable, SpaceOptimizer,
    SpaceOptimizerConfig, StackingEngine, StackingRule, VerticalStacker, VisualConstraints,
    default_rules,
};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl From<ConstraintViolation> for ConfigError {
    fn from(violation: ConstraintViolation) -> Self {
        Self::Invalid {
            field: format!("constraints.{}", violation.field),
            reason: violation.reason,
        }
    }
}

/// Calendar surface the layout is computed for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarConfig {
    pub week_start: Weekday,
    pub available_width: f64,
    pub available_height: f64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let constraints = VisualConstraints::default();
        Self {
            week_start: Weekday::Mon,
            available_width: constraints.max_task_width,
            available_height: constraints.max_stack_height,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub constraints: VisualConstraints,
    pub height: HeightConfig,
    pub position: PositionConfig,
    pub optimizer: SpaceOptimizerConfig,
    pub priority: PriorityConfig,
    pub calendar: CalendarConfig,
    /// Replaces the built-in rule order when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<StackingRule>>,
}

impl LayoutConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LayoutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.constraints.validate()?;

        if self.height.base_height <= 0.0 {
            return Err(invalid("height.base_height", "must be positive"));
        }

        let thresholds = [
            ("optimizer.compression_threshold", self.optimizer.compression_threshold),
            ("optimizer.expansion_threshold", self.optimizer.expansion_threshold),
        ];
        for (field, value) in thresholds {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("must be in (0, 1], got {}", value)));
            }
        }
        if self.optimizer.max_expansion < 1.0 {
            return Err(invalid("optimizer.max_expansion", "must be at least 1.0"));
        }

        for (category, weight) in &self.priority.category_weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(invalid(
                    "priority.category_weights",
                    format!("weight for '{}' must be in [0, 1], got {}", category, weight),
                ));
            }
        }
        let weights = &self.priority.weights;
        if weights.category_weight + weights.milestone_weight + weights.duration_weight <= 0.0 {
            return Err(invalid("priority.weights", "weights must not all be zero"));
        }

        if self.calendar.available_width < 0.0 || self.calendar.available_height < 0.0 {
            return Err(invalid("calendar", "available area must be non-negative"));
        }

        if let Some(rules) = &self.rules
            && rules.is_empty()
        {
            return Err(invalid("rules", "rule list must not be empty when given"));
        }

        Ok(())
    }

    /// Rule table from `[[rules]]`, or the built-in order
    pub fn rule_table(&self) -> RuleTable {
        match &self.rules {
            Some(rules) => RuleTable::new(rules.clone()),
            None => RuleTable::new(default_rules()),
        }
    }

    /// Assemble a layout pass wired with every configured section
    pub fn layout_pass(&self) -> LayoutPass {
        let engine = StackingEngine::new()
            .with_rules(self.rule_table())
            .with_ranker(PriorityRanker::new(self.priority.clone()));
        let vertical = VerticalStacker::new(
            HeightCalculator::new(self.height.clone()),
            PositionCalculator::new(self.position.clone()),
            SpaceOptimizer::new(
                self.optimizer.clone(),
                PositionCalculator::new(self.position.clone()),
            ),
        );

        LayoutPass::new(self.constraints.clone())
            .with_engine(engine)
            .with_vertical_stacker(vertical)
            .with_week_start(self.calendar.week_start)
            .with_available_area(self.calendar.available_width, self.calendar.available_height)
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load an explicit file, or discover one using the hierarchy
    pub fn load(explicit: Option<&Path>) -> Result<LayoutConfig, ConfigError> {
        if let Some(path) = explicit {
            info!("Loading configuration from: {:?}", path);
            return LayoutConfig::from_toml_file(path);
        }
        Self::discover_config()
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<LayoutConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return LayoutConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(LayoutConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    pub fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(explicit) = std_env::var(env::CONFIG_ENV_VAR)
            && !explicit.trim().is_empty()
        {
            candidates.push(PathBuf::from(explicit));
        }

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(env::local_config_file_path(&current_dir));
            candidates.push(env::project_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_PATH));

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Write the default configuration to `path`, leaving an existing file untouched
    pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            warn!("Configuration file already exists: {:?}", path);
            return Ok(false);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            info!("Created configuration directory: {:?}", parent);
        }

        LayoutConfig::default().to_toml_file(path)?;
        info!("Created default configuration file: {:?}", path);
        Ok(true)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
