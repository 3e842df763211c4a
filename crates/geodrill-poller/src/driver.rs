//! Poll driver
//!
//! A run goes `idle -> active -> (iterating)* -> idle`. [`PollDriver::begin`]
//! validates the project and claims it by setting `polling_active`;
//! [`PreparedRun::execute`] performs the iterations and always clears the
//! flag again, whichever way the run ends.
//!
//! Failure classes:
//! - configuration problems fail `begin` before any iteration and leave the
//!   flag untouched,
//! - source errors skip the iteration and are recorded in the summary,
//! - frame errors are logged by the [`FramePipeline`] and keep the previous image,
//! - store errors abort the run.

use geodrill_core::config::LayeredConfig;
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{
    DrillingPoint, IterationResult, NewMessage, Project, ProjectId, ProjectUpdate,
};
use geodrill_core::trajectory::DEFAULT_FALLBACK_STEP;
use geodrill_source::{DrillingSource, SourceConnector};
use geodrill_store::{MessageStore, ObjectStorage, ProjectStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{AccumulatedStep, PathAccumulator};
use crate::frames::FramePipeline;
use crate::summary::{IterationError, RunSummary, StopReason};

/// Tunables of the poll worker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Depth increment for iterations without a usable step
    pub fallback_step_md: f64,
    /// Largest iteration count a single run may request
    pub max_iterations: u32,
}

impl PollSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            fallback_step_md: config.fallback_step_md.value,
            max_iterations: config.max_iterations.value,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&LayeredConfig::with_defaults())
    }
}

/// Progress of one iteration, reported to a [`PollObserver`]
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub iteration: u32,
    pub index: u64,
    /// Point appended by the iteration, `None` when it was skipped
    pub point: Option<DrillingPoint>,
    pub error: Option<String>,
}

impl IterationReport {
    pub fn succeeded(&self) -> bool {
        self.point.is_some()
    }
}

/// Receives per-iteration progress, e.g. to drive a progress bar
pub trait PollObserver: Send + Sync {
    fn on_iteration(&self, report: &IterationReport);
}

/// Runs polling iterations for projects
#[derive(Clone)]
pub struct PollDriver {
    projects: Arc<dyn ProjectStore>,
    messages: Arc<dyn MessageStore>,
    connector: Arc<dyn SourceConnector>,
    frames: FramePipeline,
    accumulator: PathAccumulator,
    settings: PollSettings,
}

impl PollDriver {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        messages: Arc<dyn MessageStore>,
        objects: Arc<dyn ObjectStorage>,
        connector: Arc<dyn SourceConnector>,
        settings: PollSettings,
    ) -> Self {
        let fallback_step = settings.fallback_step_md;
        let fallback_step = if fallback_step.is_finite() && fallback_step > 0.0 {
            fallback_step
        } else {
            DEFAULT_FALLBACK_STEP
        };

        Self {
            projects,
            messages,
            connector,
            frames: FramePipeline::new(objects),
            accumulator: PathAccumulator::new(fallback_step),
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Validate the request and mark the project as polling.
    ///
    /// Nothing is written when this fails.
    pub async fn begin(&self, project_id: ProjectId, iterations: u32) -> Result<PreparedRun> {
        if iterations == 0 || iterations > self.settings.max_iterations {
            return Err(GeodrillError::ConfigInvalid {
                key: "iterations".to_string(),
                reason: format!(
                    "must be between 1 and {}, got {}",
                    self.settings.max_iterations, iterations
                ),
            });
        }

        let project = self
            .projects
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

        let base_url = project
            .external_api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GeodrillError::ConfigMissing {
                key: "external_api_url".to_string(),
            })?;
        let source = self.connector.connect(base_url)?;

        let project = self
            .projects
            .update_project(project_id, &ProjectUpdate::polling(true))
            .await?;

        tracing::info!(
            project_id = %project_id,
            iterations,
            base_index = project.current_index,
            "Polling started"
        );

        Ok(PreparedRun {
            driver: self.clone(),
            project,
            source,
            iterations,
            observer: None,
        })
    }

    /// `begin` followed by `execute`
    pub async fn run(
        &self,
        project_id: ProjectId,
        iterations: u32,
        token: &CancellationToken,
    ) -> Result<RunSummary> {
        self.begin(project_id, iterations).await?.execute(token).await
    }
}

/// A claimed project, ready to iterate
pub struct PreparedRun {
    driver: PollDriver,
    /// Snapshot taken when the run was claimed
    project: Project,
    source: Arc<dyn DrillingSource>,
    iterations: u32,
    observer: Option<Arc<dyn PollObserver>>,
}

impl PreparedRun {
    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn with_observer(mut self, observer: Arc<dyn PollObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run the iterations, then clear `polling_active`
    pub async fn execute(self, token: &CancellationToken) -> Result<RunSummary> {
        let project_id = self.project.id;
        let outcome = self.iterate(token).await;

        let cleared = self
            .driver
            .projects
            .update_project(project_id, &ProjectUpdate::polling(false))
            .await;

        match (outcome, cleared) {
            (Ok(summary), Ok(_)) => {
                tracing::info!(
                    project_id = %project_id,
                    attempted = summary.attempted,
                    succeeded = summary.succeeded,
                    failed = summary.failed(),
                    stop_reason = ?summary.stop_reason,
                    "Polling finished"
                );
                Ok(summary)
            }
            (Ok(_), Err(e)) => {
                tracing::error!(project_id = %project_id, error = %e, "Failed to clear polling flag");
                Err(e)
            }
            (Err(e), cleared) => {
                if let Err(clear_err) = cleared {
                    tracing::error!(
                        project_id = %project_id,
                        error = %clear_err,
                        "Failed to clear polling flag"
                    );
                }
                tracing::error!(project_id = %project_id, error = %e, "Polling aborted");
                Err(e)
            }
        }
    }

    async fn iterate(&self, token: &CancellationToken) -> Result<RunSummary> {
        let project_id = self.project.id;
        let base_index = self.project.current_index;
        let delay = self.project.polling_delay();

        let mut path = self.project.path();
        let mut metrics = self.project.metrics();
        let mut has_initial_image = self.project.initial_image_url.is_some();
        let mut summary =
            RunSummary::start(self.iterations, base_index, metrics, path.points.len());

        for i in 0..self.iterations {
            if token.is_cancelled() || !self.still_active().await? {
                tracing::info!(project_id = %project_id, iteration = i, "Polling stopped");
                summary.stop_reason = StopReason::Cancelled;
                break;
            }

            let index = base_index + u64::from(i);
            summary.attempted += 1;
            tracing::debug!(project_id = %project_id, iteration = i, index, "Fetching iteration");

            match self.source.fetch_iteration(index).await {
                Ok(result) => {
                    let step = self.driver.accumulator.apply(&path, metrics, &result, index);
                    let published = self
                        .driver
                        .frames
                        .publish(project_id, index, &result, self.source.as_ref())
                        .await;

                    let mut update = ProjectUpdate {
                        current_index: Some(index + 1),
                        metrics: Some(step.metrics),
                        drilling_path_data: Some(Some(step.path.clone())),
                        ..ProjectUpdate::default()
                    };
                    if let Some(url) = &published {
                        update.current_image_url = Some(Some(url.clone()));
                        if !has_initial_image {
                            update.initial_image_url = Some(Some(url.clone()));
                        }
                    }
                    self.driver.projects.update_project(project_id, &update).await?;

                    let content = describe_iteration(index, &result, &step);
                    let message =
                        NewMessage::activity(project_id, content).with_image(published.clone());
                    self.driver.messages.insert_message(&message).await?;

                    tracing::info!(
                        project_id = %project_id,
                        index,
                        depth = step.point.depth,
                        meters_drilled = step.metrics.meters_drilled,
                        lithology = %step.point.lithology,
                        "Iteration persisted"
                    );

                    has_initial_image |= published.is_some();
                    summary.succeeded += 1;
                    summary.final_index = index + 1;
                    self.notify(IterationReport {
                        iteration: i,
                        index,
                        point: Some(step.point),
                        error: None,
                    });
                    path = step.path;
                    metrics = step.metrics;
                }
                Err(e) => {
                    tracing::warn!(project_id = %project_id, index, error = %e, "Iteration skipped");
                    summary.errors.push(IterationError {
                        iteration: i,
                        index,
                        message: e.to_string(),
                    });
                    self.notify(IterationReport {
                        iteration: i,
                        index,
                        point: None,
                        error: Some(e.to_string()),
                    });
                }
            }

            if i + 1 < self.iterations && !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        tracing::info!(project_id = %project_id, "Polling cancelled while waiting");
                        summary.stop_reason = StopReason::Cancelled;
                        break;
                    }
                }
            }
        }

        summary.metrics = metrics;
        summary.point_count = path.points.len();
        Ok(summary)
    }

    /// Re-read the authoritative flag; clearing it in the store stops the run
    async fn still_active(&self) -> Result<bool> {
        let live = self
            .driver
            .projects
            .get_project(self.project.id)
            .await?
            .ok_or_else(|| GeodrillError::ProjectNotFound {
                id: self.project.id.to_string(),
            })?;
        Ok(live.polling_active)
    }

    fn notify(&self, report: IterationReport) {
        if let Some(observer) = &self.observer {
            observer.on_iteration(&report);
        }
    }
}

fn describe_iteration(index: u64, result: &IterationResult, step: &AccumulatedStep) -> String {
    let action = result
        .action
        .as_ref()
        .and_then(|a| a.kind.as_deref())
        .unwrap_or("none");

    format!(
        "Iteration {}: action {} ({:.1} m, inclination {:.1}°, azimuth {:.1}°). \
         Lithology: {}. Depth {:.1} m, meters drilled {:.1}, \
         precision improvement {:.1}%, image quality {:.1}%.",
        index,
        action,
        step.step.step_md,
        step.step.inclination_deg,
        step.step.azimuth_deg,
        step.point.lithology,
        step.point.depth,
        step.metrics.meters_drilled,
        step.metrics.precision_improvement,
        step.metrics.image_quality,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodrill_core::models::{DrillingAction, DrillingPath, Metrics};

    #[test]
    fn test_describe_iteration() {
        let result = IterationResult {
            action: Some(DrillingAction {
                step_md: Some(10.0),
                inclination: Some(0.0),
                azimuth: Some(0.0),
                kind: Some("drill".to_string()),
            }),
            observed_lithology: Some("Shale".to_string()),
            current_md: Some(10.0),
            ..IterationResult::default()
        };
        let step =
            PathAccumulator::default().apply(&DrillingPath::new(), Metrics::floor(), &result, 3);

        let text = describe_iteration(3, &result, &step);
        assert!(text.starts_with("Iteration 3: action drill (10.0 m"));
        assert!(text.contains("Lithology: Shale"));
        assert!(text.contains("meters drilled 10.0"));
    }

    #[test]
    fn test_settings_from_defaults() {
        let settings = PollSettings::default();
        assert_eq!(settings.fallback_step_md, DEFAULT_FALLBACK_STEP);
        assert_eq!(settings.max_iterations, 500);
    }
}
