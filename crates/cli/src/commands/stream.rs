use anyhow::Result;
use colored::*;
use fanout_core::stream::{fibonacci_stream, stream_from_iter, Fibonacci, FIBONACCI_U64_LIMIT};

pub async fn execute(count: usize, capacity: Option<usize>) -> Result<()> {
    if count > FIBONACCI_U64_LIMIT {
        anyhow::bail!(
            "At most {} Fibonacci values fit in a u64, {} requested",
            FIBONACCI_U64_LIMIT,
            count
        );
    }

    let mut values = match capacity {
        Some(capacity) => stream_from_iter(capacity, Fibonacci::new().take(count))?,
        None => fibonacci_stream(count)?,
    };

    println!(
        "{} {}",
        format!("First {} Fibonacci numbers", count).bold(),
        format!("(channel capacity {})", values.capacity()).bright_black()
    );

    // Reading from the channel means the producer never shares a variable with us
    while let Some(value) = values.recv().await {
        println!("{}", value);
    }

    Ok(())
}
