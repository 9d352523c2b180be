//! Command execution utilities
//!
//! This module turns a configured task into a work item: shell command lines
//! and program-with-arguments commands run as child processes with consistent
//! error handling and logging.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::configs::tasks::{Command as TaskCommand, TaskConfig};
use crate::types::{FanoutError, FanoutResult};

/// What a successful command left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
}

/// Unified command executor that handles common setup and execution patterns
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    working_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable on every spawned command
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Execute a configured task; the task name is exported as `FANOUT_TASK`
    pub async fn execute_task(&self, task: &TaskConfig) -> FanoutResult<CommandOutput> {
        let executor = self.clone().with_env("FANOUT_TASK", task.name.as_str());
        match &task.command {
            TaskCommand::Single(cmd) => executor.execute_shell_command(cmd).await,
            TaskCommand::Multiple(cmds) => {
                let (program, args) = cmds.split_first().ok_or_else(|| {
                    FanoutError::Task(format!("Task '{}' has no command to execute", task.name))
                })?;
                executor.execute_command_with_args(program, args).await
            }
        }
    }

    /// Execute a single shell command
    pub async fn execute_shell_command(&self, cmd: &str) -> FanoutResult<CommandOutput> {
        let mut command = shell(cmd);
        self.execute_command(
            &mut command,
            &format!("Failed to execute command '{}'", cmd),
            &format!("Command '{}' failed with exit code", cmd),
        )
        .await
    }

    /// Execute a command with arguments
    pub async fn execute_command_with_args(
        &self,
        command_path: &str,
        args: &[String],
    ) -> FanoutResult<CommandOutput> {
        let mut command = Command::new(command_path);
        command.args(args);
        self.execute_command(
            &mut command,
            &format!("Failed to execute command '{}'", command_path),
            &format!("Command '{}' failed with exit code", command_path),
        )
        .await
    }

    /// Execute a command with common setup and error handling
    async fn execute_command(
        &self,
        command: &mut Command,
        execution_error_message: &str,
        failure_error_message: &str,
    ) -> FanoutResult<CommandOutput> {
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        // A cancelled or timed-out item must not leave its child running
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?command.as_std(), "spawning command");
        let output = command
            .output()
            .await
            .map_err(|e| FanoutError::Task(format!("{}: {}", execution_error_message, e)))?;

        let exit_code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(FanoutError::Task(if stderr.is_empty() {
                format!("{}: {}", failure_error_message, exit_code)
            } else {
                format!("{}: {} ({})", failure_error_message, exit_code, stderr)
            }));
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        })
    }
}

fn shell(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}
