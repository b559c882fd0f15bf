use anyhow::{Context, Result};
use chrono::Datelike;
use planner_layout::cli::{
    AnalyzeConfig, Args, ConfigDiscovery, ExecutionMode, LayoutConfig, LayoutRunConfig,
    TaskLoader,
};
use planner_layout::{CalendarWindow, LayoutOutput, TaskStackRenderer, env};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose() {
        "planner_layout=debug"
    } else {
        env::DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match mode {
        ExecutionMode::Layout(config) => run_layout(config),
        ExecutionMode::Analyze(config) => run_analyze(config),
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
        ExecutionMode::InitConfig(path) => init_config(path),
    }
}

fn load_config(config_override: Option<&Path>) -> Result<LayoutConfig> {
    ConfigDiscovery::load(config_override).context("Failed to load layout configuration")
}

fn run_layout(config: LayoutRunConfig) -> Result<()> {
    let layout_config = load_config(config.config_override.as_deref())?;
    let loaded = TaskLoader::new()
        .load_csv(&config.tasks_file)
        .with_context(|| format!("Failed to load tasks from {:?}", config.tasks_file))?;

    let (year, month) = match config.month {
        Some(month) => month,
        None => {
            let earliest = loaded
                .tasks
                .iter()
                .map(|task| task.start_date)
                .min()
                .context("Task list is empty")?;
            (earliest.year(), earliest.month())
        }
    };
    let window = CalendarWindow::month(year, month)
        .with_context(|| format!("Invalid month {}-{:02}", year, month))?;
    debug!("Laying out {}-{:02} for {} tasks", year, month, loaded.tasks.len());

    let output = layout_config
        .layout_pass()
        .run(loaded.tasks, Some(window), config.today);
    report_skipped(&output);

    let renderer = TaskStackRenderer::from_output(&output);
    let month_layout = renderer
        .month_layout(year, month)
        .with_context(|| format!("Invalid month {}-{:02}", year, month))?;

    let json = if config.pretty {
        serde_json::to_string_pretty(&month_layout)?
    } else {
        serde_json::to_string(&month_layout)?
    };

    match &config.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Layout written to {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn run_analyze(config: AnalyzeConfig) -> Result<()> {
    let layout_config = load_config(config.config_override.as_deref())?;
    let loaded = TaskLoader::new()
        .load_csv(&config.tasks_file)
        .with_context(|| format!("Failed to load tasks from {:?}", config.tasks_file))?;

    let output = layout_config
        .layout_pass()
        .run(loaded.tasks, None, config.today);
    report_skipped(&output);

    println!("Tracks: {}", output.stacker.max_tracks());
    if let Some(overlaps) = &output.context.overlaps {
        println!("{}", overlaps.summary());
    }
    if let Some(priorities) = &output.context.priorities {
        println!("{}", priorities.summary());
    }
    println!("{}", output.stacking.summary());
    println!("{}", output.vertical.summary());

    if !output.stacking.recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in &output.stacking.recommendations {
            println!("  - {}", recommendation);
        }
    }

    Ok(())
}

fn report_skipped(output: &LayoutOutput) {
    for task_id in output.stacker.skipped_tasks() {
        warn!("Task '{}' was left out of the layout", task_id);
    }
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .context("Could not determine home directory")?;
            env::user_config_file_path(Path::new(&home))
        }
    };

    if ConfigDiscovery::create_default_config(&path)? {
        println!("Created default configuration: {:?}", path);
    } else {
        println!("Configuration already exists: {:?}", path);
    }
    Ok(())
}
