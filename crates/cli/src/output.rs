//! Terminal presentation helpers shared by the commands

use std::time::Duration;

use colored::*;
use fanout_core::execution::CommandOutput;
use fanout_core::{ItemFailure, ItemOutcome};

/// Get a consistent color for a task name
pub fn key_color(key: &str) -> Color {
    let hash = key
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    // Label colors that stay clear of the red/green used for status
    let colors = [
        Color::TrueColor {
            r: 147,
            g: 112,
            b: 219,
        },
        Color::TrueColor {
            r: 64,
            g: 224,
            b: 208,
        },
        Color::TrueColor {
            r: 255,
            g: 140,
            b: 0,
        },
        Color::TrueColor {
            r: 199,
            g: 21,
            b: 133,
        },
        Color::TrueColor {
            r: 72,
            g: 209,
            b: 204,
        },
        Color::TrueColor {
            r: 138,
            g: 43,
            b: 226,
        },
    ];

    colors[(hash % colors.len() as u64) as usize]
}

pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Print one task outcome, with its captured stdout indented underneath
pub fn print_outcome(outcome: &ItemOutcome<CommandOutput>) {
    let label = format!("{}. {}", outcome.index + 1, outcome.key).color(key_color(&outcome.key));
    match &outcome.result {
        Ok(output) => {
            println!(
                "{} {} {}",
                "✓".green().bold(),
                label,
                format_duration(outcome.elapsed).bright_black()
            );
            for line in output.stdout.lines() {
                println!("    {}", line.dimmed());
            }
        }
        Err(ItemFailure::Cancelled(_)) => {
            println!("{} {} {}", "-".yellow().bold(), label, "skipped".yellow());
        }
        Err(failure) => {
            println!("{} {} {}", "✗".red().bold(), label, failure.to_string().red());
        }
    }
}
