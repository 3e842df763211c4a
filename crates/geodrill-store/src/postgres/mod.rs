//! PostgreSQL storage adapter implementation

pub mod config;
pub mod message;
pub mod migrations;
pub mod project;

pub use config::{ConfigError, MigrationConfig, PoolConfig, PostgresConfig};
pub use migrations::{MigrationError, MigrationManager, MigrationStatus};

use geodrill_core::error::{GeodrillError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given configuration
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| GeodrillError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Failed to connect to database: {}", e)))?;

        let store = Self { pool, config };
        store.health_check().await?;
        Ok(store)
    }

    /// Connect and apply pending migrations when `auto_run` is enabled
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        let auto_run = config.migrations.auto_run;
        let store = Self::new(config).await?;
        if auto_run {
            store.run_migrations().await?;
        }
        Ok(store)
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<()> {
        MigrationManager::new(self.pool.clone())
            .run_migrations()
            .await
            .map_err(|e| GeodrillError::Storage(format!("Migration failed: {}", e)))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        MigrationManager::new(self.pool.clone())
            .check_status()
            .await
            .map_err(|e| {
                GeodrillError::Storage(format!("Failed to check migration status: {}", e))
            })
    }

    /// Check if there are pending migrations
    pub async fn has_pending_migrations(&self) -> Result<bool> {
        MigrationManager::new(self.pool.clone())
            .has_pending_migrations()
            .await
            .map_err(|e| {
                GeodrillError::Storage(format!("Failed to check pending migrations: {}", e))
            })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GeodrillError::Storage(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// Convert an unsigned counter to the signed column type
pub(crate) fn to_db_int(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| GeodrillError::Storage(format!("{} out of range: {}", column, value)))
}

/// Convert a signed column back to an unsigned counter
pub(crate) fn from_db_int(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| GeodrillError::Storage(format!("Negative {} in database: {}", column, value)))
}
