//! Command implementations

mod config;
mod db;
mod poll;
mod project;
mod reset;
mod status;
mod stop;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geodrill_core::models::ProjectId;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Project(args) => project::execute(args, cli.storage, config_path, &output).await,
        Commands::Poll(args) => poll::execute(args, cli.storage, config_path, &output).await,
        Commands::Stop(args) => stop::execute(args, cli.storage, &output).await,
        Commands::Reset(args) => reset::execute(args, cli.storage, &output).await,
        Commands::Status(args) => status::execute(args, cli.storage, &output).await,
        Commands::Config(args) => config::execute(args, config_path, &output),
        Commands::Db(args) => db::execute(args, &output).await,
    }
}

pub(crate) fn parse_project_id(raw: &str) -> Result<ProjectId> {
    raw.parse::<ProjectId>()
        .with_context(|| format!("'{}' is not a project ID", raw))
}
