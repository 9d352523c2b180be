//! Serial versus parallel comparison
//!
//! Runs the same items twice, once one at a time and once concurrently, so the
//! cost of the serial baseline can be set against the fan-out version.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::configs::run::{ConcurrencyMode, RunConfig};
use crate::execution::runner::{TaskRunner, WorkItem};
use crate::results::RunResult;
use crate::types::FanoutResult;

/// Both runs of a comparison
#[derive(Debug)]
pub struct Comparison<T> {
    pub serial: RunResult<T>,
    pub parallel: RunResult<T>,
}

impl<T> Comparison<T> {
    pub fn serial_elapsed(&self) -> Duration {
        self.serial.elapsed
    }

    pub fn parallel_elapsed(&self) -> Duration {
        self.parallel.elapsed
    }

    /// How many times faster the parallel run was (1.0 when no time was measured)
    pub fn speedup(&self) -> f64 {
        let parallel = self.parallel.elapsed.as_secs_f64();
        if parallel == 0.0 {
            return 1.0;
        }
        self.serial.elapsed.as_secs_f64() / parallel
    }

    /// Whether both runs produced the same value or failure text at every position
    pub fn outcomes_agree(&self) -> bool
    where
        T: PartialEq,
    {
        self.serial.len() == self.parallel.len()
            && self
                .serial
                .iter()
                .zip(self.parallel.iter())
                .all(|(s, p)| match (&s.result, &p.result) {
                    (Ok(a), Ok(b)) => a == b,
                    (Err(a), Err(b)) => a.to_string() == b.to_string(),
                    _ => false,
                })
    }
}

/// Run `items` serially and then in parallel with otherwise identical policy.
///
/// The mode in `config` is ignored; its limit, timeouts and fail-fast flag
/// apply to both runs.
pub async fn compare<I, T, E, F, Fut>(
    items: Vec<WorkItem<I>>,
    config: RunConfig,
    work: F,
) -> FanoutResult<Comparison<T>>
where
    I: Clone + Send + 'static,
    T: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let serial_runner = TaskRunner::new(config.clone().with_mode(ConcurrencyMode::Serial))?;
    let parallel_runner = TaskRunner::new(config.with_mode(ConcurrencyMode::Parallel))?;
    let work = Arc::new(work);

    let serial_work = Arc::clone(&work);
    let serial = serial_runner
        .run(items.clone(), move |input| (*serial_work)(input))
        .await;

    let parallel_work = Arc::clone(&work);
    let parallel = parallel_runner
        .run(items, move |input| (*parallel_work)(input))
        .await;

    let comparison = Comparison { serial, parallel };
    info!(
        serial_ms = comparison.serial_elapsed().as_millis() as u64,
        parallel_ms = comparison.parallel_elapsed().as_millis() as u64,
        speedup = comparison.speedup(),
        "comparison finished"
    );

    Ok(comparison)
}
