//! Configuration parsing
//!
//! This module holds the run policy consumed by the task runner and the YAML
//! task-file format consumed by the CLI.

pub mod run;
pub mod tasks;

pub use run::{parse_run_config, ConcurrencyMode, RunConfig, RunConfigOverrides};
pub use tasks::{load_tasks_file, parse_tasks_config, Command, TaskConfig, TasksFileConfig};
