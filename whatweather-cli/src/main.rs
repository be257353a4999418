//! Binary crate for the `whatweather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Collecting responses and writing them to the output directory

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod collect;
mod output;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG wins, then WHATWEATHER_LOG
    let log_level = std::env::var("WHATWEATHER_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
