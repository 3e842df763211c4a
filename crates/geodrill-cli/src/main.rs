//! GeoDrill CLI - Command-line interface
//!
//! Foreground polling, project management and database maintenance for the
//! GeoDrill poll worker.

mod cli;
mod commands;
mod config;
mod output;
mod progress;
mod storage;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use output::OutputWriter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let runtime = tokio::runtime::Runtime::new()?;

    if let Err(e) = runtime.block_on(commands::execute(cli)) {
        OutputWriter::new(json).error(format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
