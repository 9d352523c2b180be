//! Bounded producer/consumer stream
//!
//! A producer thread computes values and pushes them through a fixed-capacity
//! channel; the consumer pulls them one at a time. The producer blocks while
//! the channel is full and the consumer blocks while it is empty, so neither
//! side can run more than `capacity` values ahead of the other.

use std::iter::FusedIterator;
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{FanoutError, FanoutResult};

/// Number of Fibonacci values representable in a `u64` (F(0) through F(93))
pub const FIBONACCI_U64_LIMIT: usize = 94;

/// Single-pass, ordered, finite sequence fed by a background producer.
///
/// Iterate it from synchronous code, or call [`Stream::recv`] from async
/// code; the blocking [`Iterator`] impl must not be driven from inside an
/// async runtime.
#[derive(Debug)]
pub struct Stream<T> {
    rx: mpsc::Receiver<T>,
    capacity: usize,
}

impl<T> Stream<T> {
    /// Wait for the next value; `None` once the producer has finished
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }
}

impl<T> FusedIterator for Stream<T> {}

/// Publish every value of `values` through a conduit holding at most `capacity` values
pub fn stream_from_iter<T, It>(capacity: usize, values: It) -> FanoutResult<Stream<T>>
where
    T: Send + 'static,
    It: IntoIterator<Item = T>,
    It::IntoIter: Send + 'static,
{
    if capacity == 0 {
        return Err(FanoutError::Config(
            "stream capacity must be at least 1".to_string(),
        ));
    }

    let (tx, rx) = mpsc::channel(capacity);
    let values = values.into_iter();

    thread::Builder::new()
        .name("fanout-producer".to_string())
        .spawn(move || {
            let mut sent = 0usize;
            for value in values {
                // Fails only once the consumer is gone
                if tx.blocking_send(value).is_err() {
                    debug!(sent, "consumer dropped the stream, producer stopping");
                    return;
                }
                sent += 1;
            }
            debug!(sent, "producer finished");
        })?;

    Ok(Stream { rx, capacity })
}

/// Produce exactly `count` values by calling `generator` repeatedly
pub fn stream<T, G>(count: usize, capacity: usize, generator: G) -> FanoutResult<Stream<T>>
where
    T: Send + 'static,
    G: FnMut() -> T + Send + 'static,
{
    stream_from_iter(capacity, std::iter::repeat_with(generator).take(count))
}

/// The first `count` Fibonacci numbers, buffered with room for all of them
pub fn fibonacci_stream(count: usize) -> FanoutResult<Stream<u64>> {
    if count > FIBONACCI_U64_LIMIT {
        return Err(FanoutError::Config(format!(
            "at most {} Fibonacci values fit in a u64, {} requested",
            FIBONACCI_U64_LIMIT, count
        )));
    }
    let mut fib = Fibonacci::new();
    stream(count, count.max(1), move || fib.next().unwrap_or_default())
}

/// Fibonacci sequence starting at 0, 1; ends instead of overflowing
#[derive(Debug, Clone)]
pub struct Fibonacci {
    current: Option<u64>,
    next: Option<u64>,
}

impl Fibonacci {
    pub fn new() -> Self {
        Self {
            current: Some(0),
            next: Some(1),
        }
    }
}

impl Default for Fibonacci {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Fibonacci {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.current?;
        self.current = self.next;
        self.next = self.next.and_then(|next| current.checked_add(next));
        Some(current)
    }
}

/// Value reached after `n - 1` steps of the recurrence, so `fibonacci_nth(10) == Some(34)`
pub fn fibonacci_nth(n: usize) -> Option<u64> {
    Fibonacci::new().nth(n.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fibonacci_stream_of_ten() {
        let values: Vec<u64> = fibonacci_stream(10).unwrap().collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_stream_ends_cleanly_and_stays_ended() {
        let mut stream = fibonacci_stream(3).unwrap();
        assert_eq!(stream.next(), Some(0));
        assert_eq!(stream.next(), Some(1));
        assert_eq!(stream.next(), Some(1));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert_eq!(fibonacci_stream(0).unwrap().count(), 0);
        assert_eq!(stream(0, 1, || 1_u8).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_a_config_error() {
        assert!(matches!(
            stream(5, 0, || 1_u8),
            Err(FanoutError::Config(_))
        ));
    }

    #[test]
    fn test_fibonacci_stream_limit() {
        let values: Vec<u64> = fibonacci_stream(FIBONACCI_U64_LIMIT).unwrap().collect();
        assert_eq!(values.len(), FIBONACCI_U64_LIMIT);
        assert_eq!(values.last(), Some(&12_200_160_415_121_876_738));
        assert!(fibonacci_stream(FIBONACCI_U64_LIMIT + 1).is_err());
    }

    #[test]
    fn test_producer_is_held_back_by_capacity() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let mut stream = stream(100, 2, move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        // Two buffered values plus one the producer is blocked trying to send
        assert!(produced.load(Ordering::SeqCst) <= 3);

        assert_eq!(stream.next(), Some(0));
        assert_eq!(stream.next(), Some(1));
        assert_eq!(stream.next(), Some(2));
        assert_eq!(stream.capacity(), 2);
    }

    #[test]
    fn test_dropping_the_stream_stops_the_producer() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let mut stream = stream(1_000_000, 1, move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();
        assert_eq!(stream.next(), Some(0));
        drop(stream);

        std::thread::sleep(Duration::from_millis(50));
        let after_drop = produced.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(produced.load(Ordering::SeqCst), after_drop);
        assert!(after_drop < 10);
    }

    #[tokio::test]
    async fn test_async_consumer_sees_generation_order() {
        let mut stream = stream_from_iter(4, 0..50_u32).unwrap();
        let mut seen = Vec::new();
        while let Some(value) = stream.recv().await {
            seen.push(value);
        }
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn test_fibonacci_iterator_stops_before_overflow() {
        assert_eq!(Fibonacci::new().count(), FIBONACCI_U64_LIMIT);
    }

    #[test]
    fn test_fibonacci_nth() {
        assert_eq!(fibonacci_nth(10), Some(34));
        assert_eq!(fibonacci_nth(1), Some(0));
        assert_eq!(fibonacci_nth(0), Some(0));
        assert_eq!(fibonacci_nth(2), Some(1));
        assert_eq!(fibonacci_nth(FIBONACCI_U64_LIMIT + 1), None);
    }
}
