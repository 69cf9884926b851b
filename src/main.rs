//! Cab Risk - Main Entry Point

use cab_risk::cli::{run, Cli};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cab_risk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
