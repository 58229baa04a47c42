// Ledger Guard - Entry point
// Principle: Parameters change slowly and only as a validated whole; broken invariants stop the node

#![allow(dead_code)]

mod cli;
mod governance;
mod invariants;
mod storage;
mod types;

#[cfg(test)]
mod tests;

use clap::Parser;
use cli::runner::{run, RunnerError};
use cli::Cli;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_filter = if cli.verbose {
        "debug"
    } else {
        &cli.log_level
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        // Already logged by the enforcer
        Err(e @ RunnerError::Halted(_)) => Err(anyhow::anyhow!(e)),
        Err(e) => {
            error!("{}", e);
            Err(anyhow::anyhow!(e))
        }
    }
}
