use std::path::Path;

use anyhow::Result;
use colored::*;
use fanout_core::configs::{load_tasks_file, TaskConfig};
use fanout_core::execution::CommandExecutor;
use fanout_core::{compare, WorkItem};

use crate::output::format_duration;

pub async fn execute(file: &Path, limit: Option<usize>, timeout_ms: Option<u64>) -> Result<()> {
    let tasks_file = load_tasks_file(file)
        .map_err(|e| anyhow::anyhow!("Failed to load task file: {}", e))?;

    let mut config = tasks_file.run_config();
    if limit.is_some() {
        config.concurrency_limit = limit;
    }
    if timeout_ms.is_some() {
        config.item_timeout_ms = timeout_ms;
    }

    println!(
        "{} {}",
        "Comparing serial and parallel runs of".bold(),
        file.display().to_string().cyan()
    );

    let executor = match file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => CommandExecutor::new().with_working_dir(dir),
        None => CommandExecutor::new(),
    };
    let items: Vec<WorkItem<TaskConfig>> = tasks_file
        .tasks
        .into_iter()
        .map(|task| WorkItem::new(task.name.clone(), task))
        .collect();

    let comparison = compare(items, config, move |task: TaskConfig| {
        let executor = executor.clone();
        async move { executor.execute_task(&task).await }
    })
    .await?;

    println!();
    println!(
        "  {:<10} {:>10}  {}",
        "serial".bold(),
        format_duration(comparison.serial_elapsed()),
        format!("{} failed", comparison.serial.failure_count()).bright_black()
    );
    println!(
        "  {:<10} {:>10}  {}",
        "parallel".bold(),
        format_duration(comparison.parallel_elapsed()),
        format!("{} failed", comparison.parallel.failure_count()).bright_black()
    );
    println!("  {:<10} {:>9.2}x", "speedup".bold(), comparison.speedup());

    if !comparison.outcomes_agree() {
        println!();
        println!(
            "{} {}",
            "!".yellow().bold(),
            "Serial and parallel outcomes differ; tasks may depend on shared state".yellow()
        );
    }

    Ok(())
}
