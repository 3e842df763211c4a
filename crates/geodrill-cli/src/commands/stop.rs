use crate::cli::{ProjectRef, StorageBackend};
use crate::commands::parse_project_id;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{bail, Result};
use geodrill_core::models::ProjectUpdate;

/// Clear the polling flag; a run in another process stops at its next iteration
pub async fn execute(args: ProjectRef, backend: StorageBackend, output: &OutputWriter) -> Result<()> {
    let id = parse_project_id(&args.project_id)?;
    let storage = Storage::new(backend).await?;

    let Some(project) = storage.projects.get_project(id).await? else {
        bail!("Project not found: {}", id);
    };

    if !project.polling_active {
        output.info(format!("Project '{}' is not polling", project.name));
        return Ok(());
    }

    storage
        .projects
        .update_project(id, &ProjectUpdate::polling(false))
        .await?;

    tracing::info!(project_id = %id, "Polling flag cleared");
    output.success(format!(
        "Stop requested for '{}'; the running poll ends at its next iteration",
        project.name
    ));
    Ok(())
}
