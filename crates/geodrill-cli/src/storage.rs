use crate::cli::StorageBackend;
use anyhow::{Context, Result};
use geodrill_store::postgres::{PostgresConfig, PostgresStore};
use geodrill_store::{MemoryMessageStore, MemoryProjectStore, MessageStore, ProjectStore};
use std::sync::Arc;

/// Parse database URL to extract connection details for error messages
fn parse_database_url(url: &str) -> (String, String, String) {
    let authority = url.split('@').nth(1).and_then(|s| s.split('/').next());

    let host = authority
        .and_then(|s| s.split(':').next())
        .unwrap_or("localhost")
        .to_string();

    let port = authority
        .and_then(|s| s.split(':').nth(1))
        .unwrap_or("5432")
        .to_string();

    let database = url
        .split('/')
        .next_back()
        .and_then(|s| s.split('?').next())
        .unwrap_or("geodrill")
        .to_string();

    (host, port, database)
}

pub struct Storage {
    pub projects: Arc<dyn ProjectStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Storage {
    pub async fn new(backend: StorageBackend) -> Result<Self> {
        match backend {
            StorageBackend::Memory => Ok(Self::new_memory()),
            StorageBackend::Postgres => Self::new_postgres().await,
        }
    }

    fn new_memory() -> Self {
        Self {
            projects: Arc::new(MemoryProjectStore::new()),
            messages: Arc::new(MemoryMessageStore::new()),
        }
    }

    async fn new_postgres() -> Result<Self> {
        let store = connect_postgres().await?;
        let store = Arc::new(store);
        Ok(Self {
            projects: store.clone(),
            messages: store,
        })
    }
}

/// Connect using `DATABASE_URL`, applying migrations unless disabled
pub async fn connect_postgres() -> Result<PostgresStore> {
    let config = PostgresConfig::from_env().context(
        "Failed to load PostgreSQL configuration. Set DATABASE_URL environment variable.",
    )?;

    PostgresStore::connect(config.clone()).await.map_err(|e| {
        let (host, port, database) = parse_database_url(&config.database_url);

        anyhow::anyhow!(
            "Failed to connect to PostgreSQL\n\n\
                Connection details:\n\
                  Host: {}\n\
                  Port: {}\n\
                  Database: {}\n\n\
                Remediation:\n\
                  1. Ensure PostgreSQL is running\n\
                  2. Check DATABASE_URL environment variable\n\
                  3. Verify credentials and database exists\n\n\
                Error: {}",
            host,
            port,
            database,
            e
        )
    })
}
