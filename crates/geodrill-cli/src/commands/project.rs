use crate::cli::{CreateProjectArgs, ProjectArgs, ProjectCommand, StorageBackend};
use crate::config::load_config;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{bail, Result};
use geodrill_core::config::CliConfigOverrides;
use geodrill_core::models::{NewProject, Project};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Index")]
    current_index: u64,
    #[tabled(rename = "Drilled (m)")]
    meters_drilled: String,
    #[tabled(rename = "Polling")]
    polling_active: bool,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&Project> for ProjectRow {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.name.clone(),
            current_index: project.current_index,
            meters_drilled: format!("{:.1}", project.meters_drilled),
            polling_active: project.polling_active,
            created_at: project.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub async fn execute(
    args: ProjectArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let storage = Storage::new(backend).await?;

    match args.command {
        ProjectCommand::Create(create) => {
            if matches!(backend, StorageBackend::Memory) {
                output.warning("Memory storage: the project is discarded when this command exits");
            }
            create_project(create, &storage, config_path, output).await
        }
        ProjectCommand::List => list_projects(&storage, output).await,
    }
}

async fn create_project(
    args: CreateProjectArgs,
    storage: &Storage,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("Project name must not be empty");
    }

    let config = load_config(config_path, CliConfigOverrides::default())?;
    let interval = args.interval.unwrap_or(config.default_polling_interval.value);

    let mut new = NewProject::new(name).with_polling_interval(interval);
    if let Some(url) = args.url.filter(|u| !u.trim().is_empty()) {
        new = new.with_external_api_url(url.trim());
    }

    let project = storage.projects.create_project(&new).await?;

    if output.is_json() {
        output.result(&project)?;
    } else {
        output.success(format!("Created project '{}'", project.name));
        output.kv("ID", project.id);
        output.kv("Polling Interval", format!("{}s", project.polling_interval));
        output.kv(
            "Drilling Source",
            project.external_api_url.as_deref().unwrap_or("(not set)"),
        );
    }

    Ok(())
}

async fn list_projects(storage: &Storage, output: &OutputWriter) -> Result<()> {
    let projects = storage.projects.list_projects().await?;
    let rows: Vec<ProjectRow> = projects.iter().map(ProjectRow::from).collect();

    output.section(format!("Projects ({})", rows.len()));
    output.table(rows)
}
