use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{Project, ProjectId, ProjectUpdate};
use geodrill_store::ProjectStore;

/// Clear a project's path, floor its metrics and unset its current image.
///
/// Refused with `PollingActive` while a run owns the project. The cursor is
/// kept, so a later run continues from the stored index.
pub async fn reset_project(projects: &dyn ProjectStore, project_id: ProjectId) -> Result<Project> {
    let project = projects
        .get_project(project_id)
        .await?
        .ok_or_else(|| GeodrillError::ProjectNotFound {
            id: project_id.to_string(),
        })?;

    if project.polling_active {
        return Err(GeodrillError::PollingActive {
            id: project_id.to_string(),
        });
    }

    let reset = projects.update_project(project_id, &ProjectUpdate::reset()).await?;
    tracing::info!(project_id = %project_id, "Project reset");
    Ok(reset)
}
