use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use geodrill_poller::{PollDriver, PollSettings};
use geodrill_source::HttpConnector;
use geodrill_store::postgres::{PostgresConfig, PostgresStore};
use geodrill_store::{
    LocalObjectStorage, MemoryMessageStore, MemoryProjectStore, MessageStore, ProjectStore,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geodrill_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geodrill_api=info,geodrill_poller=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ApiConfig::from_env();
    let worker_config = config
        .load_worker_config()
        .context("Invalid poll worker configuration")?;

    tracing::info!(
        port = config.port,
        source_path_template = %worker_config.source_path_template.value,
        image_bucket = %worker_config.image_bucket.value,
        "Starting GeoDrill API server"
    );

    let (projects, messages): (Arc<dyn ProjectStore>, Arc<dyn MessageStore>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("DATABASE_URL found, connecting to PostgreSQL...");
                let store = init_postgres_storage(database_url).await.context(
                    "Failed to connect to PostgreSQL. Ensure it is running and DATABASE_URL is correct",
                )?;
                tracing::info!("Connected to PostgreSQL");
                (store.clone(), store)
            }
            None => {
                tracing::info!("Using in-memory storage (set DATABASE_URL for PostgreSQL)");
                (Arc::new(MemoryProjectStore::new()), Arc::new(MemoryMessageStore::new()))
            }
        };

    let objects = Arc::new(LocalObjectStorage::new(
        &config.object_root,
        worker_config.image_bucket.value.clone(),
        config.public_base_url.clone(),
    ));
    let connector = Arc::new(HttpConnector::new(worker_config.source_path_template.value.clone()));

    let driver = PollDriver::new(
        projects.clone(),
        messages.clone(),
        objects,
        connector,
        PollSettings::from_config(&worker_config),
    );

    let state = Arc::new(
        AppState::new(projects, messages, driver, worker_config)
            .with_object_root(&config.object_root),
    );
    let runs = state.runs.clone();

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .context("Invalid GEODRILL_CORS_ORIGIN")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(state).layer(cors);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", config.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    runs.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize PostgreSQL storage from a database URL
async fn init_postgres_storage(database_url: &str) -> anyhow::Result<Arc<PostgresStore>> {
    let config = PostgresConfig::from_database_url(database_url).context("Invalid DATABASE_URL")?;
    let store = PostgresStore::connect(config).await?;
    Ok(Arc::new(store))
}
