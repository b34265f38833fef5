//! Specgrade - Dependency-aware API contract grading CLI
//!
//! Grades OpenAPI contracts against a rule catalog with cascading
//! dependency semantics and weighted category scoring.

use anyhow::Result;
use clap::Parser;
use specgrade::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level when set
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    cli::run(cli)
}
