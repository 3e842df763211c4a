use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Health
        .route("/health", get(handlers::health_check))

        // Projects
        .route("/api/v1/projects", post(handlers::create_project).get(handlers::list_projects))
        .route(
            "/api/v1/projects/{project_id}",
            get(handlers::get_project).patch(handlers::update_project),
        )
        .route("/api/v1/projects/{project_id}/reset", post(handlers::reset_project))
        .route("/api/v1/projects/{project_id}/path", get(handlers::get_project_path))
        .route("/api/v1/projects/{project_id}/messages", get(handlers::list_messages))

        // Polling
        .route("/api/v1/polling/start", post(handlers::start_polling))
        .route("/api/v1/polling/stop", post(handlers::stop_polling))
        .route("/api/v1/polling/runs", get(handlers::list_runs))
        .route("/api/v1/polling/runs/{run_id}", get(handlers::get_run));

    // Locally stored frame images
    if let Some(root) = &state.object_root {
        router = router.nest_service("/objects", ServeDir::new(root));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
