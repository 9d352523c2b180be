//! Fanout Core Library
//!
//! This is the core library for the fanout concurrency toolkit. It runs sets of
//! independent work items serially or in parallel and streams generated values
//! through a bounded producer/consumer conduit.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`execution`] - Task runner, per-item fault boundary, shell commands and
//!   serial-versus-parallel comparison
//! - [`results`] - Per-item outcomes and position-aligned run results
//! - [`stream`] - Bounded producer/consumer stream and the Fibonacci recurrence
//! - [`configs`] - Run policy and task file parsing
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fanout_core::{run, RunConfig, WorkItem};
//!
//! # async fn example() -> fanout_core::FanoutResult<()> {
//! let items = WorkItem::from_inputs(["ok", "bad", "ok"]);
//! let config = RunConfig::parallel().with_concurrency_limit(2);
//! let result = run(items, config, |word| async move {
//!     if word == "bad" {
//!         anyhow::bail!("rejected {}", word);
//!     }
//!     Ok(word.len())
//! })
//! .await?;
//!
//! assert_eq!(result.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod execution;
pub mod results;
pub mod stream;
pub mod types;

// Re-export the main types for easier usage
pub use configs::{ConcurrencyMode, RunConfig};
pub use execution::{compare, run, Comparison, TaskRunner, WorkItem};
pub use results::{ItemFailure, ItemOutcome, RunResult};
pub use stream::{fibonacci_stream, stream, Stream};
pub use types::{error_is, FanoutError, FanoutResult};
