use crate::cli::{PollArgs, StorageBackend};
use crate::commands::parse_project_id;
use crate::config::load_config;
use crate::output::OutputWriter;
use crate::progress::PollProgress;
use crate::storage::Storage;
use anyhow::{Context, Result};
use geodrill_core::config::CliConfigOverrides;
use geodrill_core::models::{NewProject, ProjectId};
use geodrill_poller::{CancellationToken, PollDriver, PollSettings, RunSummary};
use geodrill_source::HttpConnector;
use geodrill_store::LocalObjectStorage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct SkippedRow {
    #[tabled(rename = "Iteration")]
    iteration: u32,
    #[tabled(rename = "Index")]
    index: u64,
    #[tabled(rename = "Error")]
    message: String,
}

/// Run a polling loop in the foreground; Ctrl-C stops it after the current iteration
pub async fn execute(
    args: PollArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = load_config(
        config_path,
        CliConfigOverrides {
            source_path_template: args.source_path.clone(),
            fallback_step_md: args.fallback_step,
            max_iterations: args.max_iterations,
            ..CliConfigOverrides::default()
        },
    )?;
    let storage = Storage::new(backend).await?;

    let project_id = resolve_project(&args, &storage, config.default_polling_interval.value).await?;
    let iterations = args.iterations.unwrap_or(config.default_iterations.value);

    let objects = Arc::new(LocalObjectStorage::new(
        &args.object_root,
        config.image_bucket.value.clone(),
        args.public_base_url.clone(),
    ));
    let connector = Arc::new(HttpConnector::new(config.source_path_template.value.clone()));

    let driver = PollDriver::new(
        storage.projects.clone(),
        storage.messages.clone(),
        objects,
        connector,
        PollSettings::from_config(&config),
    );

    let prepared = driver
        .begin(project_id, iterations)
        .await
        .with_context(|| format!("Cannot start polling project {}", project_id))?;

    if !output.is_json() {
        let project = prepared.project();
        output.info(format!(
            "Polling '{}' from index {} ({} iterations, {}s apart)",
            project.name, project.current_index, iterations, project.polling_interval
        ));
    }

    let progress = Arc::new(PollProgress::new(iterations, !output.is_json()));
    let token = CancellationToken::new();

    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping after the current iteration");
                token.cancel();
            }
        })
    };

    let result = prepared.with_observer(progress.clone()).execute(&token).await;
    interrupt.abort();

    let summary = result?;
    progress.finish(if summary.was_cancelled() { "stopped" } else { "done" });

    report(&summary, output)
}

async fn resolve_project(args: &PollArgs, storage: &Storage, default_interval: u64) -> Result<ProjectId> {
    if let Some(raw) = &args.project {
        return parse_project_id(raw);
    }

    let url = args.url.as_deref().unwrap_or_default().trim();
    let new = NewProject::new(args.name.as_str())
        .with_external_api_url(url)
        .with_polling_interval(args.interval.unwrap_or(default_interval));

    let project = storage.projects.create_project(&new).await?;
    tracing::info!(project_id = %project.id, "Created project for ad-hoc polling");
    Ok(project.id)
}

fn report(summary: &RunSummary, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        return output.result(summary);
    }

    if summary.was_cancelled() {
        output.warning(format!(
            "Polling stopped after {} of {} iterations",
            summary.attempted, summary.requested
        ));
    } else {
        output.success(format!(
            "Polling finished: {} of {} iterations succeeded",
            summary.succeeded, summary.requested
        ));
    }

    output.kv("Next Index", summary.final_index);
    output.kv("Path Points", summary.point_count);
    output.kv("Meters Drilled", format!("{:.1}", summary.metrics.meters_drilled));
    output.kv(
        "Precision Improvement",
        format!("{:.1}%", summary.metrics.precision_improvement),
    );
    output.kv("Image Quality", format!("{:.1}%", summary.metrics.image_quality));

    if summary.failed() > 0 {
        output.section(format!("Skipped Iterations ({})", summary.failed()));
        let rows = summary
            .errors
            .iter()
            .map(|e| SkippedRow {
                iteration: e.iteration,
                index: e.index,
                message: e.message.clone(),
            })
            .collect();
        output.table(rows)?;
    }

    Ok(())
}
