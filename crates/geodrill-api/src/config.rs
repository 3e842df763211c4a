use std::env;
use std::path::PathBuf;

use geodrill_core::config::LayeredConfig;
use geodrill_core::error::Result;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,
    pub database_url: Option<String>,
    /// Directory holding stored frame images, served under `/objects`
    pub object_root: PathBuf,
    /// Public URL prefix of the `/objects` route
    pub public_base_url: String,
    /// Optional TOML file with poll worker settings
    pub config_path: Option<PathBuf>,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("GEODRILL_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001);

        let cors_origin = env::var("GEODRILL_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty());

        let object_root = env::var("GEODRILL_OBJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/objects"));

        let public_base_url = env::var("GEODRILL_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/objects", port));

        let config_path = env::var("GEODRILL_CONFIG").ok().map(PathBuf::from);

        Self {
            port,
            cors_origin,
            database_url,
            object_root,
            public_base_url,
            config_path,
        }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Check if PostgreSQL storage is configured
    pub fn uses_postgres(&self) -> bool {
        self.database_url.is_some()
    }

    /// Poll worker settings: defaults, then the config file, then `GEODRILL_*` variables
    pub fn load_worker_config(&self) -> Result<LayeredConfig> {
        let mut config = LayeredConfig::with_defaults();
        if let Some(path) = &self.config_path {
            config = config.load_from_file(path)?;
        }
        let config = config.load_from_env();
        config.validate()?;
        Ok(config)
    }
}
