use crate::cli::{DbArgs, DbCommand};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geodrill_store::postgres::{PostgresConfig, PostgresStore};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    #[tabled(rename = "Version")]
    version: i64,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Applied")]
    applied: bool,
}

/// Execute database management commands
pub async fn execute(args: DbArgs, output: &OutputWriter) -> Result<()> {
    let config = PostgresConfig::from_env()
        .context("Failed to load database configuration. Ensure DATABASE_URL is set.")?;

    let store = PostgresStore::new(config).await.context("Failed to connect to database")?;

    match args.command {
        DbCommand::Migrate => migrate(&store, output).await,
        DbCommand::Status => status(&store, output).await,
    }
}

async fn migrate(store: &PostgresStore, output: &OutputWriter) -> Result<()> {
    if !store.has_pending_migrations().await? {
        output.success("Database schema is up to date");
        return Ok(());
    }

    output.info("Applying migrations...");
    store.run_migrations().await.context("Failed to apply migrations")?;
    output.success("Migrations applied");
    Ok(())
}

async fn status(store: &PostgresStore, output: &OutputWriter) -> Result<()> {
    let rows: Vec<MigrationRow> = store
        .migration_status()
        .await
        .context("Failed to read migration status")?
        .into_iter()
        .map(|m| MigrationRow {
            version: m.version,
            description: m.description,
            applied: m.applied,
        })
        .collect();

    let pending = rows.iter().filter(|r| !r.applied).count();

    output.section("Migrations");
    output.table(rows)?;
    if pending > 0 {
        output.warning(format!("{} pending migration(s). Run 'geodrill db migrate'", pending));
    }
    Ok(())
}
