//! Detached polling runs and their registry

use chrono::{DateTime, Utc};
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{ProjectId, ProjectUpdate};
use geodrill_poller::{CancellationToken, RunSummary, StopReason};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Observable state of a background polling run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub project_id: ProjectId,
    pub iterations: u32,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    fn running(project_id: ProjectId, iterations: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project_id,
            iterations,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            summary: None,
            error: None,
        }
    }

    fn finish(&mut self, result: Result<RunSummary>) {
        self.finished_at = Some(Utc::now());
        match result {
            Ok(summary) => {
                self.status = match summary.stop_reason {
                    StopReason::Exhausted => RunStatus::Completed,
                    StopReason::Cancelled => RunStatus::Cancelled,
                };
                self.summary = Some(summary);
            }
            Err(e) => {
                self.status = RunStatus::Failed;
                self.error = Some(e.to_string());
            }
        }
    }
}

struct RunEntry {
    record: RunRecord,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Finished runs kept per project for inspection
pub const DEFAULT_FINISHED_RUNS_PER_PROJECT: usize = 20;

/// Tracks detached polling tasks.
///
/// Running entries are always kept; finished ones are evicted oldest first
/// once a project has more than `keep_finished` of them.
#[derive(Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<Uuid, RunEntry>>>,
    keep_finished: usize,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_FINISHED_RUNS_PER_PROJECT)
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(keep_finished: usize) -> Self {
        Self {
            runs: Arc::default(),
            keep_finished,
        }
    }

    async fn insert(&self, record: RunRecord, token: CancellationToken) {
        let entry = RunEntry {
            record,
            token,
            handle: None,
        };
        self.runs.write().await.insert(entry.record.run_id, entry);
    }

    async fn attach(&self, run_id: Uuid, handle: JoinHandle<()>) {
        if let Some(entry) = self.runs.write().await.get_mut(&run_id) {
            entry.handle = Some(handle);
        }
    }

    async fn finish(&self, run_id: Uuid, result: Result<RunSummary>) {
        let mut runs = self.runs.write().await;
        let Some(entry) = runs.get_mut(&run_id) else {
            return;
        };
        entry.record.finish(result);
        let project_id = entry.record.project_id;

        let mut finished: Vec<(DateTime<Utc>, Uuid)> = runs
            .values()
            .filter(|e| e.record.project_id == project_id && e.record.status != RunStatus::Running)
            .map(|e| (e.record.started_at, e.record.run_id))
            .collect();
        if finished.len() <= self.keep_finished {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.keep_finished;
        for (_, id) in finished.into_iter().take(excess) {
            runs.remove(&id);
        }
        tracing::debug!(project_id = %project_id, evicted = excess, "Evicted finished runs");
    }

    /// Whether a run of this process still owns the project
    pub async fn is_running(&self, project_id: ProjectId) -> bool {
        self.runs
            .read()
            .await
            .values()
            .any(|e| e.record.project_id == project_id && e.record.status == RunStatus::Running)
    }

    pub async fn get(&self, run_id: Uuid) -> Option<RunRecord> {
        self.runs.read().await.get(&run_id).map(|e| e.record.clone())
    }

    /// All runs, newest first
    pub async fn list(&self) -> Vec<RunRecord> {
        let mut records: Vec<RunRecord> =
            self.runs.read().await.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    /// Cancel the running runs of a project, returning how many were signalled
    pub async fn cancel_project(&self, project_id: ProjectId) -> usize {
        let runs = self.runs.read().await;
        let mut cancelled = 0;
        for entry in runs.values() {
            if entry.record.project_id == project_id && entry.record.status == RunStatus::Running {
                entry.token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel every running run and wait for each to clear its polling flag
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut runs = self.runs.write().await;
            runs.values_mut()
                .filter_map(|entry| {
                    entry.token.cancel();
                    entry.handle.take()
                })
                .collect()
        };

        tracing::info!(runs = handles.len(), "Waiting for polling runs to stop");
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Polling task ended abnormally");
            }
        }
    }
}

/// Result of a stop request
#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    pub project_id: ProjectId,
    pub was_active: bool,
    pub cancelled_runs: usize,
}

/// Starts and stops background polling runs
pub struct PollingService;

impl PollingService {
    /// Claim the project and spawn the run; returns once the task is detached.
    ///
    /// A stopped run keeps its claim until it has cleared the polling flag, so
    /// a restart is refused until then.
    pub async fn start(
        state: &AppState,
        project_id: ProjectId,
        iterations: u32,
    ) -> Result<RunRecord> {
        if state.runs.is_running(project_id).await {
            return Err(GeodrillError::PollingActive {
                id: project_id.to_string(),
            });
        }

        let prepared = state.driver.begin(project_id, iterations).await?;

        let token = CancellationToken::new();
        let record = RunRecord::running(project_id, iterations);
        let run_id = record.run_id;
        state.runs.insert(record.clone(), token.clone()).await;

        let runs = state.runs.clone();
        let handle = tokio::spawn(async move {
            let result = prepared.execute(&token).await;
            if let Err(e) = &result {
                tracing::error!(run_id = %run_id, error = %e, "Polling run failed");
            }
            runs.finish(run_id, result).await;
        });
        state.runs.attach(run_id, handle).await;

        tracing::info!(run_id = %run_id, project_id = %project_id, iterations, "Polling run spawned");
        Ok(record)
    }

    /// Clear the polling flag and cancel this process's runs for the project.
    ///
    /// Runs observe the change at their next iteration boundary.
    pub async fn stop(state: &AppState, project_id: ProjectId) -> Result<StopOutcome> {
        let project = state
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| GeodrillError::ProjectNotFound {
                id: project_id.to_string(),
            })?;

        state
            .projects
            .update_project(project_id, &ProjectUpdate::polling(false))
            .await?;
        let cancelled_runs = state.runs.cancel_project(project_id).await;

        tracing::info!(
            project_id = %project_id,
            was_active = project.polling_active,
            cancelled_runs,
            "Polling stop requested"
        );

        Ok(StopOutcome {
            project_id,
            was_active: project.polling_active,
            cancelled_runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record_at(project_id: ProjectId, minutes: i64) -> RunRecord {
        let mut record = RunRecord::running(project_id, 1);
        record.started_at = Utc::now() - Duration::minutes(60 - minutes);
        record
    }

    async fn finished(registry: &RunRegistry, project_id: ProjectId, minutes: i64) -> Uuid {
        let record = record_at(project_id, minutes);
        let run_id = record.run_id;
        registry.insert(record, CancellationToken::new()).await;
        registry
            .finish(run_id, Err(GeodrillError::Storage("down".to_string())))
            .await;
        run_id
    }

    #[tokio::test]
    async fn test_finished_runs_evicted_oldest_first() {
        let registry = RunRegistry::with_retention(2);
        let project = ProjectId::new();
        let other = ProjectId::new();

        let live = record_at(project, 0);
        let live_id = live.run_id;
        registry.insert(live, CancellationToken::new()).await;

        let first = finished(&registry, project, 1).await;
        let second = finished(&registry, project, 2).await;
        let elsewhere = finished(&registry, other, 3).await;
        let third = finished(&registry, project, 4).await;
        let fourth = finished(&registry, project, 5).await;

        assert!(registry.get(first).await.is_none());
        assert!(registry.get(second).await.is_none());
        assert!(registry.get(third).await.is_some());
        assert!(registry.get(fourth).await.is_some());
        assert!(registry.get(elsewhere).await.is_some());

        let live = registry.get(live_id).await.unwrap();
        assert_eq!(live.status, RunStatus::Running);
        assert_eq!(registry.list().await.len(), 4);
    }

    #[tokio::test]
    async fn test_is_running_tracks_status() {
        let registry = RunRegistry::new();
        let project = ProjectId::new();
        let record = RunRecord::running(project, 3);
        let run_id = record.run_id;

        registry.insert(record, CancellationToken::new()).await;
        assert!(registry.is_running(project).await);
        assert!(!registry.is_running(ProjectId::new()).await);

        registry
            .finish(run_id, Err(GeodrillError::Storage("down".to_string())))
            .await;
        assert!(!registry.is_running(project).await);
        assert_eq!(registry.get(run_id).await.unwrap().status, RunStatus::Failed);
    }
}
