//! Status command implementation

use crate::cli::{StatusArgs, StorageBackend};
use crate::commands::parse_project_id;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{bail, Result};
use geodrill_core::models::{ChatMessage, DrillingPoint, Project};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct PointRow {
    #[tabled(rename = "Index")]
    iteration: u64,
    #[tabled(rename = "X")]
    x: String,
    #[tabled(rename = "Y")]
    y: String,
    #[tabled(rename = "Depth")]
    depth: String,
    #[tabled(rename = "Lithology")]
    lithology: String,
}

impl From<&DrillingPoint> for PointRow {
    fn from(point: &DrillingPoint) -> Self {
        Self {
            iteration: point.iteration,
            x: format!("{:.2}", point.x),
            y: format!("{:.2}", point.y),
            depth: format!("{:.2}", point.depth),
            lithology: point.lithology.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    project: Project,
    point_count: usize,
    measured_length: f64,
    max_depth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<Vec<ChatMessage>>,
}

/// Recent messages shown with `--messages`
const RECENT_MESSAGES: usize = 10;

pub async fn execute(args: StatusArgs, backend: StorageBackend, output: &OutputWriter) -> Result<()> {
    let id = parse_project_id(&args.project_id)?;
    let storage = Storage::new(backend).await?;

    let Some(project) = storage.projects.get_project(id).await? else {
        bail!("Project not found: {}", id);
    };

    let messages = if args.messages {
        let mut all = storage.messages.list_messages(id).await?;
        let skip = all.len().saturating_sub(RECENT_MESSAGES);
        all.drain(..skip);
        Some(all)
    } else {
        None
    };

    let path = project.path();

    if output.is_json() {
        return output.result(StatusOutput {
            point_count: path.points.len(),
            measured_length: path.measured_length(),
            max_depth: path.max_depth(),
            project,
            messages,
        });
    }

    output.section(format!("Project '{}'", project.name));
    output.kv("ID", project.id);
    output.kv(
        "Drilling Source",
        project.external_api_url.as_deref().unwrap_or("(not set)"),
    );
    output.kv("Polling", if project.polling_active { "active" } else { "idle" });
    output.kv("Polling Interval", format!("{}s", project.polling_interval));
    output.kv("Next Index", project.current_index);
    output.kv("Updated", project.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    output.section("Metrics");
    output.kv("Meters Drilled", format!("{:.1}", project.meters_drilled));
    output.kv("Precision Improvement", format!("{:.1}%", project.precision_improvement));
    output.kv("Image Quality", format!("{:.1}%", project.image_quality));
    output.kv("Initial Image", project.initial_image_url.as_deref().unwrap_or("-"));
    output.kv("Current Image", project.current_image_url.as_deref().unwrap_or("-"));

    output.section("Trajectory");
    output.kv("Points", path.points.len());
    output.kv("Measured Length", format!("{:.1} m", path.measured_length()));
    output.kv("Max Depth", format!("{:.1} m", path.max_depth()));
    output.kv("Status", format!("{:?}", path.status));
    if path.obstacle_detected {
        match path.obstacle_position {
            Some(pos) => output.warning(format!(
                "Obstacle detected at x={:.1} y={:.1} depth={:.1}",
                pos.x, pos.y, pos.depth
            )),
            None => output.warning("Obstacle detected"),
        }
    }

    let skip = path.points.len().saturating_sub(args.points);
    let rows: Vec<PointRow> = path.points[skip..].iter().map(PointRow::from).collect();
    if !rows.is_empty() {
        output.table(rows)?;
    }

    if let Some(messages) = messages {
        output.section("Recent Activity");
        if messages.is_empty() {
            output.info("No activity yet");
        }
        for message in messages {
            output.kv(message.created_at.format("%H:%M:%S"), message.content);
        }
    }

    Ok(())
}
