use std::error::Error as StdError;

use thiserror::Error;

/// The main error type for fanout operations
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Run aborted by item {index} ('{key}'): {reason}")]
    Aborted {
        index: usize,
        key: String,
        reason: String,
    },
}

/// Result type alias for fanout operations
pub type FanoutResult<T> = Result<T, FanoutError>;

/// Report whether `target` appears anywhere in the source chain of `err`,
/// including `err` itself.
///
/// Wrapping an error with `#[source]`, `#[from]` or `anyhow::Context` keeps
/// the wrapped value reachable, so a derived error still compares equal to
/// the base it was built from.
pub fn error_is<E>(err: &(dyn StdError + 'static), target: &E) -> bool
where
    E: StdError + PartialEq + 'static,
{
    std::iter::successors(Some(err), |e| (*e).source())
        .any(|e| e.downcast_ref::<E>().is_some_and(|found| found == target))
}
