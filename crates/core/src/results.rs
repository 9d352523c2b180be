//! Result types for runner operations
//!
//! Every submitted work item produces exactly one [`ItemOutcome`], and a
//! [`RunResult`] keeps those outcomes in submission order no matter which item
//! finished first.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::configs::run::ConcurrencyMode;
use crate::types::{error_is, FanoutError, FanoutResult};

/// Why a single work item did not produce a value
#[derive(Debug, Error)]
pub enum ItemFailure {
    /// The work function returned an error
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The work function panicked; the panic was contained at the item boundary
    #[error("panicked: {0}")]
    Panicked(String),

    /// The item exceeded its own timeout or the run deadline
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The item was never started, or was interrupted, because another item failed under fail-fast
    #[error("cancelled after item {0} failed")]
    Cancelled(usize),
}

impl ItemFailure {
    /// The error returned by the work function, if that is why the item failed
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            ItemFailure::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether `target` is the returned error or anywhere in its source chain
    pub fn is<E>(&self, target: &E) -> bool
    where
        E: StdError + PartialEq + 'static,
    {
        self.error()
            .is_some_and(|err| error_is(&**err, target))
    }
}

/// Outcome of one work item, tagged with its submission position
#[derive(Debug)]
pub struct ItemOutcome<T> {
    pub index: usize,
    pub key: String,
    pub result: Result<T, ItemFailure>,
    pub elapsed: Duration,
}

impl<T> ItemOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        self.result.as_ref().err()
    }
}

/// Position-aligned outcomes of a whole run
#[derive(Debug)]
pub struct RunResult<T> {
    pub mode: ConcurrencyMode,
    pub outcomes: Vec<ItemOutcome<T>>,
    pub elapsed: Duration,
    /// Index of the item whose failure stopped a fail-fast run
    pub aborted_at: Option<usize>,
}

impl<T> RunResult<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemOutcome<T>> {
        self.outcomes.iter()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome<T>> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }

    /// The failure that should be reported for the run as a whole, if any.
    /// Under fail-fast that is the triggering item, otherwise the first failure by position.
    pub fn first_failure(&self) -> Option<&ItemOutcome<T>> {
        match self.aborted_at {
            Some(index) => self.outcomes.get(index),
            None => self.failures().next(),
        }
    }

    /// Turn the run into an error if any item failed
    pub fn check(&self) -> FanoutResult<()> {
        let Some(outcome) = self.first_failure() else {
            return Ok(());
        };
        let reason = outcome
            .failure()
            .map(ToString::to_string)
            .unwrap_or_default();

        if self.aborted_at.is_some() {
            return Err(FanoutError::Aborted {
                index: outcome.index,
                key: outcome.key.clone(),
                reason,
            });
        }

        Err(FanoutError::Task(format!(
            "{} of {} items failed; first was item {} ('{}'): {}",
            self.failure_count(),
            self.len(),
            outcome.index,
            outcome.key,
            reason
        )))
    }

    /// All values in submission order, or the run-level error from [`RunResult::check`]
    pub fn into_values(self) -> FanoutResult<Vec<T>> {
        self.check()?;
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect())
    }
}

impl<T> IntoIterator for RunResult<T> {
    type Item = ItemOutcome<T>;
    type IntoIter = std::vec::IntoIter<ItemOutcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, result: Result<u32, ItemFailure>) -> ItemOutcome<u32> {
        ItemOutcome {
            index,
            key: format!("item-{}", index),
            result,
            elapsed: Duration::ZERO,
        }
    }

    fn run_result(
        outcomes: Vec<ItemOutcome<u32>>,
        aborted_at: Option<usize>,
    ) -> RunResult<u32> {
        RunResult {
            mode: ConcurrencyMode::Parallel,
            outcomes,
            elapsed: Duration::ZERO,
            aborted_at,
        }
    }

    #[test]
    fn test_counts_and_values() {
        let result = run_result(
            vec![
                outcome(0, Ok(1)),
                outcome(1, Err(ItemFailure::Panicked("boom".to_string()))),
                outcome(2, Ok(3)),
            ],
            None,
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert!(!result.all_succeeded());
        assert_eq!(result.first_failure().map(|o| o.index), Some(1));
    }

    #[test]
    fn test_check_reports_first_failure() {
        let result = run_result(
            vec![
                outcome(0, Ok(1)),
                outcome(1, Err(ItemFailure::TimedOut(Duration::from_millis(5)))),
            ],
            None,
        );
        let err = result.check().unwrap_err();
        assert!(matches!(err, FanoutError::Task(_)));
        assert!(err.to_string().contains("item 1 ('item-1')"));
    }

    #[test]
    fn test_check_reports_fail_fast_trigger() {
        let result = run_result(
            vec![
                outcome(0, Err(ItemFailure::Cancelled(1))),
                outcome(1, Err(ItemFailure::Failed(anyhow::anyhow!("bad input")))),
                outcome(2, Err(ItemFailure::Cancelled(1))),
            ],
            Some(1),
        );
        match result.check() {
            Err(FanoutError::Aborted { index, key, reason }) => {
                assert_eq!(index, 1);
                assert_eq!(key, "item-1");
                assert_eq!(reason, "bad input");
            }
            other => panic!("expected Aborted, got {:?}", other),
        }
    }

    #[test]
    fn test_into_values_keeps_submission_order() {
        let result = run_result(vec![outcome(0, Ok(10)), outcome(1, Ok(20))], None);
        assert_eq!(result.into_values().unwrap(), vec![10, 20]);
    }

    #[derive(Debug, Error, PartialEq)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_failure_is_matches_wrapped_error() {
        let failure = ItemFailure::Failed(anyhow::Error::new(DiskFull).context("writing output"));
        assert!(failure.is(&DiskFull));
        assert_eq!(failure.to_string(), "writing output: disk full");
        assert!(!ItemFailure::Cancelled(0).is(&DiskFull));
    }
}
