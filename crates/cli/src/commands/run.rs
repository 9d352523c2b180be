use std::path::Path;

use anyhow::Result;
use colored::*;
use fanout_core::configs::{load_tasks_file, RunConfigOverrides, TaskConfig};
use fanout_core::execution::CommandExecutor;
use fanout_core::{TaskRunner, WorkItem};

use crate::output::{format_duration, print_outcome};

pub async fn execute(file: &Path, overrides: RunConfigOverrides) -> Result<()> {
    let tasks_file = load_tasks_file(file)
        .map_err(|e| anyhow::anyhow!("Failed to load task file: {}", e))?;
    let config = tasks_file.run_config().merge(overrides);
    let runner = TaskRunner::new(config)?;

    let title = tasks_file
        .name
        .clone()
        .unwrap_or_else(|| file.display().to_string());
    println!(
        "{} {} {}",
        "Running".bold(),
        title.cyan(),
        format!("({} tasks, {})", tasks_file.tasks.len(), runner.config().mode).bright_black()
    );
    println!();

    // Tasks run relative to the directory holding the task file
    let base_dir = file.parent().filter(|p| !p.as_os_str().is_empty());
    let executor = match base_dir {
        Some(dir) => CommandExecutor::new().with_working_dir(dir),
        None => CommandExecutor::new(),
    };

    let items: Vec<WorkItem<TaskConfig>> = tasks_file
        .tasks
        .into_iter()
        .map(|task| WorkItem::new(task.name.clone(), task))
        .collect();

    let result = runner
        .run(items, move |task: TaskConfig| {
            let executor = executor.clone();
            async move { executor.execute_task(&task).await }
        })
        .await;

    for outcome in result.iter() {
        print_outcome(outcome);
    }

    println!();
    if result.all_succeeded() {
        println!(
            "{} {} {}",
            "✓".green().bold(),
            "All tasks completed successfully!".green().bold(),
            format_duration(result.elapsed).bright_black()
        );
        return Ok(());
    }

    println!(
        "{} {}",
        "✗".red().bold(),
        format!(
            "{} of {} tasks failed",
            result.failure_count(),
            result.len()
        )
        .red()
        .bold()
    );
    result
        .check()
        .map_err(|e| anyhow::anyhow!("Run failed: {}", e))
}
