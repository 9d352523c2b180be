use std::collections::HashSet;
use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configs::run::RunConfig;
use crate::types::{FanoutError, FanoutResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    /// A shell command line, run through `sh -c`
    Single(String),
    /// A program followed by its arguments, run without a shell
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub description: Option<String>,
    pub command: Command,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TasksFileConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Default run policy; command-line flags take precedence
    pub run: Option<RunConfig>,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl TasksFileConfig {
    /// The run policy declared in the file, or the default policy
    pub fn run_config(&self) -> RunConfig {
        self.run.clone().unwrap_or_default()
    }

    fn validate(&self) -> FanoutResult<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(FanoutError::Config("Task name cannot be empty".to_string()));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(FanoutError::Config(format!(
                    "Task '{}' is defined more than once",
                    task.name
                )));
            }
            match &task.command {
                Command::Single(cmd) if cmd.trim().is_empty() => {
                    return Err(FanoutError::Config(format!(
                        "Task '{}' has an empty command",
                        task.name
                    )));
                }
                Command::Multiple(cmds) if cmds.is_empty() => {
                    return Err(FanoutError::Config(format!(
                        "Task '{}' has an empty command",
                        task.name
                    )));
                }
                _ => {}
            }
        }
        if let Some(run) = &self.run {
            run.validate()?;
        }
        Ok(())
    }
}

pub fn parse_tasks_config(yaml_str: &str) -> FanoutResult<TasksFileConfig> {
    let config: TasksFileConfig = serde_yaml::from_str(yaml_str)?;
    config.validate()?;
    Ok(config)
}

/// Read and parse a task file from disk
pub fn load_tasks_file(path: &Path) -> FanoutResult<TasksFileConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        FanoutError::Config(format!(
            "Failed to read task file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_tasks_config(&content)
}
