//! Per-item fault boundary
//!
//! Each work item runs inside its own tokio task so that a panic, an error or
//! an overrun is turned into an [`ItemFailure`] at the item instead of
//! tearing down the run.

use std::any::Any;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};

use crate::results::ItemFailure;

/// Aborts the wrapped task when dropped, so cancelling the caller also
/// cancels the work it was waiting on.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> AbortOnDrop<T> {
    async fn join(&mut self) -> Result<T, JoinError> {
        (&mut self.0).await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run `work` as an isolated task and classify how it ended.
///
/// The closure itself is invoked inside the task, so a panic while building
/// the future is contained as well as a panic while polling it.
pub async fn guarded<F, Fut, T, E>(work: F, timeout: Option<Duration>) -> Result<T, ItemFailure>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<anyhow::Error> + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(async move {
        work().await.map_err(|err| -> anyhow::Error { err.into() })
    }));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task.join()).await {
            Ok(joined) => joined,
            Err(_) => return Err(ItemFailure::TimedOut(limit)),
        },
        None => task.join().await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ItemFailure::Failed(err)),
        Err(err) if err.is_panic() => Err(ItemFailure::Panicked(panic_message(err.into_panic()))),
        Err(err) => Err(ItemFailure::Failed(anyhow::anyhow!(
            "task stopped before completing: {}",
            err
        ))),
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_success_passes_through() {
        let result = guarded(|| async { Ok::<_, anyhow::Error>(42) }, None).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_error_becomes_failed() {
        let result: Result<u32, _> = guarded(
            || async { Err(std::io::Error::new(std::io::ErrorKind::Other, "nope")) },
            None,
        )
        .await;
        match result {
            Err(ItemFailure::Failed(err)) => assert_eq!(err.to_string(), "nope"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_in_future_is_contained() {
        let result: Result<u32, _> = guarded(
            || async {
                if true {
                    panic!("panic");
                }
                Ok::<_, anyhow::Error>(1)
            },
            None,
        )
        .await;
        match result {
            Err(ItemFailure::Panicked(msg)) => assert_eq!(msg, "panic"),
            other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_while_building_future_is_contained() {
        let result: Result<u32, _> = guarded(
            || -> std::future::Ready<anyhow::Result<u32>> { panic!("bad {}", "setup") },
            None,
        )
        .await;
        match result {
            Err(ItemFailure::Panicked(msg)) => assert_eq!(msg, "bad setup"),
            other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_aborts_the_work() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result: Result<(), _> = guarded(
            move || async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            },
            Some(Duration::from_millis(20)),
        )
        .await;

        assert!(matches!(result, Err(ItemFailure::TimedOut(d)) if d == Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }
}
