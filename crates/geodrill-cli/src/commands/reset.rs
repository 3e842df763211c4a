use crate::cli::{ResetArgs, StorageBackend};
use crate::commands::parse_project_id;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use geodrill_poller::reset_project;

pub async fn execute(args: ResetArgs, backend: StorageBackend, output: &OutputWriter) -> Result<()> {
    let id = parse_project_id(&args.project_id)?;
    let storage = Storage::new(backend).await?;

    let Some(project) = storage.projects.get_project(id).await? else {
        bail!("Project not found: {}", id);
    };

    if !args.yes {
        if output.is_json() {
            bail!("Refusing to reset without --yes in JSON mode");
        }

        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Clear the path and metrics of '{}' ({} points)?",
                project.name,
                project.path().points.len()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            output.info("Reset cancelled");
            return Ok(());
        }
    }

    let project = reset_project(storage.projects.as_ref(), id).await?;

    if output.is_json() {
        output.result(&project)?;
    } else {
        output.success(format!("Reset project '{}'", project.name));
        output.kv("Next Index", project.current_index);
    }
    Ok(())
}
