use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fanout_core::configs::RunConfigOverrides;
use fanout_core::ConcurrencyMode;

mod commands;
mod logging;
mod output;

/// Fanout - run independent tasks serially or in parallel
#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Run independent tasks serially or in parallel and stream generated values")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "info" or "fanout_core=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every task in a task file
    Run {
        /// Path to the YAML task file
        file: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Run a task file serially and then in parallel, and compare timings
    Compare {
        /// Path to the YAML task file
        file: PathBuf,

        /// Maximum number of tasks in flight during the parallel run
        #[arg(long)]
        limit: Option<usize>,

        /// Per-task timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print Fibonacci numbers produced through a bounded channel
    Stream {
        /// How many values to produce
        #[arg(default_value_t = 10)]
        count: usize,

        /// Channel capacity (defaults to COUNT)
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Print the JSON schema of the task file format
    Schema,
}

/// Run policy flags; each one overrides the task file's `run` section
#[derive(Args)]
struct PolicyArgs {
    /// Concurrency mode: serial or parallel
    #[arg(long)]
    mode: Option<ConcurrencyMode>,

    /// Maximum number of tasks in flight at once
    #[arg(long)]
    limit: Option<usize>,

    /// Per-task timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Deadline for the whole run in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Stop at the first failing task
    #[arg(long)]
    fail_fast: bool,
}

impl PolicyArgs {
    fn overrides(&self) -> RunConfigOverrides {
        RunConfigOverrides {
            mode: self.mode,
            concurrency_limit: self.limit,
            item_timeout_ms: self.timeout_ms,
            deadline_ms: self.deadline_ms,
            fail_fast: self.fail_fast,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level)?;

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Run { file, policy } => commands::run::execute(&file, policy.overrides()).await,
        Commands::Compare {
            file,
            limit,
            timeout_ms,
        } => commands::compare::execute(&file, limit, timeout_ms).await,
        Commands::Stream { count, capacity } => commands::stream::execute(count, capacity).await,
        Commands::Schema => commands::schema::execute(),
    }
}
