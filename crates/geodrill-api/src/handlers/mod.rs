mod health;
mod polling;
mod projects;

pub use health::health_check;
pub use polling::{get_run, list_runs, start_polling, stop_polling};
pub use projects::{
    create_project, get_project, get_project_path, list_messages, list_projects, reset_project,
    update_project,
};

use geodrill_core::models::ProjectId;

use crate::error::ApiError;

pub(crate) fn parse_project_id(raw: &str) -> Result<ProjectId, ApiError> {
    raw.parse()
        .map_err(|e: geodrill_core::GeodrillError| {
            ApiError::bad_request("Invalid project ID format").with_details(e.to_string())
        })
}
