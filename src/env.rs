//! Environment constants and path utilities for the planner layout engine.
//!
//! Config file names and lookup locations live here so discovery and
//! `init-config` agree on them.

use std::path::{Path, PathBuf};

/// Per-project directory name (hidden, like .git)
pub const PLANNER_DIR_NAME: &str = ".planner";

/// Configuration file name inside [`PLANNER_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file looked up directly in the working directory
pub const LOCAL_CONFIG_FILE: &str = "planner.toml";

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLANNER_LAYOUT_CONFIG";

/// System-wide config location
pub const SYSTEM_CONFIG_PATH: &str = "/etc/planner/config.toml";

/// Default `RUST_LOG` directive when none is set
pub const DEFAULT_LOG_FILTER: &str = "planner_layout=info";

/// Build the .planner directory path from a workspace root
pub fn planner_dir_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(PLANNER_DIR_NAME)
}

/// Build the `planner.toml` path in the given directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE)
}

/// Build the `.planner/config.toml` path in the given directory
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    planner_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    planner_dir_path(home_dir).join(CONFIG_FILE_NAME)
}
