//! High-level task runner
//!
//! This module provides the main execution logic: a set of independent work
//! items is run either one at a time or concurrently, and exactly one outcome
//! per item is collected back in submission order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::configs::run::{ConcurrencyMode, RunConfig};
use crate::execution::boundary::guarded;
use crate::results::{ItemFailure, ItemOutcome, RunResult};
use crate::types::FanoutResult;

/// One unit of work submitted to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<I> {
    /// Label used in logs and results; submission position is the identity
    pub key: String,
    pub input: I,
}

impl<I> WorkItem<I> {
    pub fn new(key: impl Into<String>, input: I) -> Self {
        Self {
            key: key.into(),
            input,
        }
    }

    /// Build items keyed by their input's display form
    pub fn from_inputs<It>(inputs: It) -> Vec<Self>
    where
        It: IntoIterator<Item = I>,
        I: std::fmt::Display,
    {
        inputs
            .into_iter()
            .map(|input| Self::new(input.to_string(), input))
            .collect()
    }
}

/// Runs work items under a fixed [`RunConfig`].
///
/// The runner holds no state between calls; the same runner can be reused for
/// any number of runs.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    config: RunConfig,
}

impl TaskRunner {
    /// Validate the policy up front so a bad config fails before any work starts
    pub fn new(config: RunConfig) -> FanoutResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every item through `work` and return one outcome per item, in submission order.
    ///
    /// Failures stay local to their item unless `fail_fast` is set. Parallel
    /// mode spawns tokio tasks, so it needs a multi-threaded runtime to get
    /// real parallelism.
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<WorkItem<I>>, work: F) -> RunResult<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let started = Instant::now();
        let total = items.len();
        let work = Arc::new(work);

        debug!(mode = %self.config.mode, items = total, "starting run");

        let (outcomes, aborted_at) = match self.config.mode {
            ConcurrencyMode::Serial => self.run_serial(items, work).await,
            ConcurrencyMode::Parallel => self.run_parallel(items, work).await,
        };

        let result = RunResult {
            mode: self.config.mode,
            outcomes,
            elapsed: started.elapsed(),
            aborted_at,
        };

        info!(
            mode = %result.mode,
            items = total,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "run finished"
        );

        result
    }

    async fn run_serial<I, T, E, F, Fut>(
        &self,
        items: Vec<WorkItem<I>>,
        work: Arc<F>,
    ) -> (Vec<ItemOutcome<T>>, Option<usize>)
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let item_timeout = self.config.item_timeout();
        let deadline = self.config.deadline();
        let expires_at = deadline.and_then(|d| Instant::now().checked_add(d));

        let mut outcomes = Vec::with_capacity(items.len());
        let mut aborted_at = None;

        for (index, item) in items.into_iter().enumerate() {
            let WorkItem { key, input } = item;

            if let Some(trigger) = aborted_at {
                outcomes.push(skipped(index, key, ItemFailure::Cancelled(trigger)));
                continue;
            }

            let started = Instant::now();
            // An expired run deadline is not a fail-fast trigger
            let mut expired = false;
            let result = match (expires_at, deadline) {
                (Some(at), Some(limit)) if at <= started => {
                    expired = true;
                    Err(ItemFailure::TimedOut(limit))
                }
                (Some(at), Some(limit)) => {
                    let work = Arc::clone(&work);
                    let attempt = guarded(move || (*work)(input), item_timeout);
                    match tokio::time::timeout_at(at, attempt).await {
                        Ok(result) => result,
                        Err(_) => {
                            expired = true;
                            Err(ItemFailure::TimedOut(limit))
                        }
                    }
                }
                _ => {
                    let work = Arc::clone(&work);
                    guarded(move || (*work)(input), item_timeout).await
                }
            };

            let outcome = finished(index, key, result, started.elapsed());
            if !outcome.is_success() && self.config.fail_fast && !expired {
                aborted_at = Some(index);
            }
            outcomes.push(outcome);
        }

        (outcomes, aborted_at)
    }

    async fn run_parallel<I, T, E, F, Fut>(
        &self,
        items: Vec<WorkItem<I>>,
        work: Arc<F>,
    ) -> (Vec<ItemOutcome<T>>, Option<usize>)
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let item_timeout = self.config.item_timeout();
        let deadline = self.config.deadline();
        let expires_at = deadline.and_then(|d| Instant::now().checked_add(d));
        let permits = self
            .config
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut keys = Vec::with_capacity(items.len());
        let mut slots: Vec<Option<ItemOutcome<T>>> = Vec::with_capacity(items.len());
        let mut join_set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let WorkItem { key, input } = item;
            keys.push(key.clone());
            slots.push(None);

            let work = Arc::clone(&work);
            let permits = permits.clone();
            join_set.spawn(async move {
                // Held until the item finishes, admitting the next waiting item
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                debug!(index, key = %key, "dispatching item");
                let started = Instant::now();
                let result = guarded(move || (*work)(input), item_timeout).await;
                finished(index, key, result, started.elapsed())
            });
        }

        let mut aborted_at = None;
        let mut timed_out = false;

        loop {
            let next = match expires_at {
                Some(at) => match tokio::time::timeout_at(at, join_set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => join_set.join_next().await,
            };
            let Some(joined) = next else {
                break;
            };

            match joined {
                Ok(outcome) => {
                    let index = outcome.index;
                    let failed = !outcome.is_success();
                    slots[index] = Some(outcome);
                    if failed && self.config.fail_fast {
                        aborted_at = Some(index);
                        break;
                    }
                }
                Err(err) => warn!("Worker task ended without an outcome: {}", err),
            }
        }

        // Anything still in flight is interrupted at its next await point
        join_set.abort_all();

        let outcomes = slots
            .into_iter()
            .zip(keys)
            .enumerate()
            .map(|(index, (slot, key))| match slot {
                Some(outcome) => outcome,
                None => {
                    let failure = match (aborted_at, deadline) {
                        (Some(trigger), _) => ItemFailure::Cancelled(trigger),
                        (None, Some(limit)) if timed_out => ItemFailure::TimedOut(limit),
                        _ => ItemFailure::Panicked("worker exited without an outcome".to_string()),
                    };
                    skipped(index, key, failure)
                }
            })
            .collect();

        (outcomes, aborted_at)
    }
}

fn finished<T>(
    index: usize,
    key: String,
    result: Result<T, ItemFailure>,
    elapsed: Duration,
) -> ItemOutcome<T> {
    match &result {
        Ok(_) => debug!(index, key = %key, elapsed_ms = elapsed.as_millis() as u64, "item succeeded"),
        Err(failure) => warn!(index, key = %key, "Item failed: {}", failure),
    }
    ItemOutcome {
        index,
        key,
        result,
        elapsed,
    }
}

fn skipped<T>(index: usize, key: String, failure: ItemFailure) -> ItemOutcome<T> {
    debug!(index, key = %key, "item not completed: {}", failure);
    ItemOutcome {
        index,
        key,
        result: Err(failure),
        elapsed: Duration::ZERO,
    }
}

/// Validate `config`, then run `items` through `work` once
pub async fn run<I, T, E, F, Fut>(
    items: Vec<WorkItem<I>>,
    config: RunConfig,
    work: F,
) -> FanoutResult<RunResult<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let runner = TaskRunner::new(config)?;
    Ok(runner.run(items, work).await)
}
