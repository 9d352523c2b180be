//! Task execution module
//!
//! This module handles the actual execution of work items: the serial and
//! parallel runner, the per-item fault boundary, shell command work items and
//! the serial-versus-parallel comparison.

pub mod boundary;
pub mod command;
pub mod compare;
pub mod runner;

pub use command::{CommandExecutor, CommandOutput};
pub use compare::{compare, Comparison};
pub use runner::{run, TaskRunner, WorkItem};
