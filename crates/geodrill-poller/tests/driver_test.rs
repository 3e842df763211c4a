//! Poll driver scenarios against scripted sources and in-memory stores

use async_trait::async_trait;
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{
    ChatMessage, DrillingAction, IterationResult, NewProject, Project, ProjectId,
    ProjectUpdate,
};
use geodrill_poller::{
    CancellationToken, IterationReport, PollDriver, PollObserver, PollSettings, StopReason,
};
use geodrill_source::{DrillingSource, FramePayload, SourceConnector};
use geodrill_store::{
    MemoryMessageStore, MemoryObjectStorage, MemoryProjectStore, MessageStore, ProjectStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

enum Script {
    Respond(IterationResult),
    Status(u16),
}

/// Drilling source answering from a script; unscripted indices drill 10 m straight down
#[derive(Default)]
struct ScriptedSource {
    scripts: HashMap<u64, Script>,
    frames: HashMap<String, FramePayload>,
    requested: Mutex<Vec<u64>>,
    /// Clears the store's polling flag when this index is requested
    stop_at: Option<(u64, MemoryProjectStore, ProjectId)>,
}

impl ScriptedSource {
    fn script(mut self, index: u64, script: Script) -> Self {
        self.scripts.insert(index, script);
        self
    }

    fn frame(mut self, path: &str, payload: FramePayload) -> Self {
        self.frames.insert(path.to_string(), payload);
        self
    }

    fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

fn vertical(index: u64) -> IterationResult {
    IterationResult {
        action: Some(DrillingAction {
            step_md: Some(10.0),
            inclination: Some(0.0),
            azimuth: Some(0.0),
            kind: Some("drill".to_string()),
        }),
        current_md: Some((index + 1) as f64 * 10.0),
        observed_lithology: Some("Sandstone".to_string()),
        ..IterationResult::default()
    }
}

#[async_trait]
impl DrillingSource for ScriptedSource {
    async fn fetch_iteration(&self, index: u64) -> Result<IterationResult> {
        self.requested.lock().unwrap().push(index);

        if let Some((stop_index, store, project_id)) = &self.stop_at {
            if *stop_index == index {
                store
                    .update_project(*project_id, &ProjectUpdate::polling(false))
                    .await?;
            }
        }

        match self.scripts.get(&index) {
            Some(Script::Respond(result)) => Ok(result.clone()),
            Some(Script::Status(status)) => Err(GeodrillError::SourceStatus {
                index,
                status: *status,
            }),
            None => Ok(vertical(index)),
        }
    }

    async fn fetch_frame(&self, frame_path: &str) -> Result<FramePayload> {
        self.frames
            .get(frame_path)
            .cloned()
            .ok_or_else(|| GeodrillError::Frame {
                reason: format!("no frame at {}", frame_path),
            })
    }
}

struct FixedConnector(Arc<ScriptedSource>);

impl SourceConnector for FixedConnector {
    fn connect(&self, _base_url: &str) -> Result<Arc<dyn DrillingSource>> {
        Ok(self.0.clone())
    }
}

/// Project store whose iteration writes fail; flag updates still succeed
struct FailingProjectStore {
    inner: MemoryProjectStore,
}

#[async_trait]
impl ProjectStore for FailingProjectStore {
    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        self.inner.create_project(project).await
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        self.inner.get_project(id).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project> {
        if update.current_index.is_some() {
            return Err(GeodrillError::Storage("disk full".to_string()));
        }
        self.inner.update_project(id, update).await
    }
}

struct Harness {
    projects: MemoryProjectStore,
    messages: MemoryMessageStore,
    objects: MemoryObjectStorage,
    source: Arc<ScriptedSource>,
    driver: PollDriver,
}

fn harness_with(projects: MemoryProjectStore, source: ScriptedSource) -> Harness {
    let messages = MemoryMessageStore::new();
    let objects = MemoryObjectStorage::default();
    let source = Arc::new(source);
    let driver = PollDriver::new(
        Arc::new(projects.clone()),
        Arc::new(messages.clone()),
        Arc::new(objects.clone()),
        Arc::new(FixedConnector(source.clone())),
        PollSettings::default(),
    );
    Harness {
        projects,
        messages,
        objects,
        source,
        driver,
    }
}

async fn new_project(projects: &MemoryProjectStore) -> Project {
    projects
        .create_project(
            &NewProject::new("Test well")
                .with_external_api_url("http://simulator.local")
                .with_polling_interval(0),
        )
        .await
        .unwrap()
}

async fn reload(projects: &MemoryProjectStore, id: ProjectId) -> Project {
    projects.get_project(id).await.unwrap().unwrap()
}

async fn log(messages: &MemoryMessageStore, id: ProjectId) -> Vec<ChatMessage> {
    messages.list_messages(id).await.unwrap()
}

#[tokio::test]
async fn test_full_run_appends_one_point_per_iteration() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let h = harness_with(projects, ScriptedSource::default());

    let summary = h
        .driver
        .run(project.id, 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.requested, 5);
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 5);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.final_index, 5);
    assert_eq!(summary.point_count, 5);

    let stored = reload(&h.projects, project.id).await;
    assert!(!stored.polling_active);
    assert_eq!(stored.current_index, 5);
    assert_eq!(stored.meters_drilled, 50.0);

    let path = stored.path();
    let depths: Vec<f64> = path.points.iter().map(|p| p.depth).collect();
    assert_eq!(depths, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    let iterations: Vec<u64> = path.points.iter().map(|p| p.iteration).collect();
    assert_eq!(iterations, vec![0, 1, 2, 3, 4]);

    let messages = log(&h.messages, project.id).await;
    assert_eq!(messages.len(), 5);
    assert!(messages[0].content.starts_with("Iteration 0: action drill"));
}

#[tokio::test]
async fn test_http_error_skips_only_that_iteration() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let h = harness_with(projects, ScriptedSource::default().script(2, Script::Status(500)));

    let summary = h
        .driver
        .run(project.id, 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(h.source.requested(), vec![0, 1, 2, 3, 4]);
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].iteration, 2);
    assert_eq!(summary.errors[0].index, 2);
    assert!(summary.errors[0].message.contains("500"));

    let stored = reload(&h.projects, project.id).await;
    assert_eq!(stored.path().points.len(), 4);
    assert_eq!(stored.current_index, 5);
    assert!(!stored.polling_active);
    assert_eq!(log(&h.messages, project.id).await.len(), 4);
}

#[tokio::test]
async fn test_cleared_flag_stops_after_two_iterations() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let source = ScriptedSource {
        stop_at: Some((1, projects.clone(), project.id)),
        ..ScriptedSource::default()
    };
    let h = harness_with(projects, source);

    let summary = h
        .driver
        .run(project.id, 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(h.source.requested(), vec![0, 1]);

    let stored = reload(&h.projects, project.id).await;
    assert_eq!(stored.path().points.len(), 2);
    assert_eq!(stored.current_index, 2);
    assert!(!stored.polling_active);
    assert_eq!(log(&h.messages, project.id).await.len(), 2);
}

struct CancelAfterFirst(CancellationToken);

impl PollObserver for CancelAfterFirst {
    fn on_iteration(&self, report: &IterationReport) {
        if report.iteration == 0 {
            self.0.cancel();
        }
    }
}

#[tokio::test]
async fn test_token_interrupts_pacing_delay() {
    let projects = MemoryProjectStore::new();
    let project = projects
        .create_project(
            &NewProject::new("Slow well")
                .with_external_api_url("http://simulator.local")
                .with_polling_interval(3600),
        )
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default());

    let token = CancellationToken::new();
    let run = h
        .driver
        .begin(project.id, 3)
        .await
        .unwrap()
        .with_observer(Arc::new(CancelAfterFirst(token.clone())));

    let summary = tokio::time::timeout(std::time::Duration::from_secs(5), run.execute(&token))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.succeeded, 1);
    assert!(!reload(&h.projects, project.id).await.polling_active);
}

/// Records when each iteration finished, relative to `start`
struct IterationClock {
    start: tokio::time::Instant,
    offsets: Mutex<Vec<Duration>>,
}

impl PollObserver for IterationClock {
    fn on_iteration(&self, _report: &IterationReport) {
        self.offsets.lock().unwrap().push(self.start.elapsed());
    }
}

#[tokio::test(start_paused = true)]
async fn test_interval_separates_iterations_but_not_after_last() {
    let projects = MemoryProjectStore::new();
    let project = projects
        .create_project(
            &NewProject::new("Paced well")
                .with_external_api_url("http://simulator.local")
                .with_polling_interval(5),
        )
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default().script(1, Script::Status(503)));

    let start = tokio::time::Instant::now();
    let clock = Arc::new(IterationClock {
        start,
        offsets: Mutex::new(Vec::new()),
    });
    let summary = h
        .driver
        .begin(project.id, 4)
        .await
        .unwrap()
        .with_observer(clock.clone())
        .execute(&CancellationToken::new())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.errors[0].index, 1);

    // Three gaps of five seconds, the failed iteration included
    let tolerance = Duration::from_millis(10);
    let offsets = clock.offsets.lock().unwrap().clone();
    assert_eq!(offsets.len(), 4);
    for (i, offset) in offsets.iter().enumerate() {
        let expected = Duration::from_secs(5 * i as u64);
        assert!(
            *offset >= expected && *offset < expected + tolerance,
            "iteration {} finished at {:?}",
            i,
            offset
        );
    }
    assert!(elapsed >= Duration::from_secs(15));
    assert!(elapsed < Duration::from_secs(15) + tolerance);
}

#[tokio::test(start_paused = true)]
async fn test_single_iteration_does_not_wait() {
    let projects = MemoryProjectStore::new();
    let project = projects
        .create_project(
            &NewProject::new("One shot")
                .with_external_api_url("http://simulator.local")
                .with_polling_interval(3600),
        )
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default());

    let start = tokio::time::Instant::now();
    let summary = h
        .driver
        .run(project.id, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_missing_url_is_a_configuration_error() {
    let projects = MemoryProjectStore::new();
    let project = projects
        .create_project(&NewProject::new("No source"))
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default());

    let err = h
        .driver
        .run(project.id, 5, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeodrillError::ConfigMissing { .. }));
    assert!(h.source.requested().is_empty());
    assert!(!reload(&h.projects, project.id).await.polling_active);
    assert!(h.messages.is_empty());
}

#[tokio::test]
async fn test_start_refused_while_active() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    projects
        .update_project(project.id, &ProjectUpdate::polling(true))
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default());

    let err = h.driver.begin(project.id, 1).await.err().unwrap();
    assert!(matches!(err, GeodrillError::PollingActive { .. }));
    assert!(reload(&h.projects, project.id).await.polling_active);
}

#[tokio::test]
async fn test_iteration_count_bounds() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let h = harness_with(projects, ScriptedSource::default());

    assert!(matches!(
        h.driver.begin(project.id, 0).await.err().unwrap(),
        GeodrillError::ConfigInvalid { .. }
    ));
    assert!(matches!(
        h.driver.begin(project.id, 501).await.err().unwrap(),
        GeodrillError::ConfigInvalid { .. }
    ));
    assert!(!reload(&h.projects, project.id).await.polling_active);
}

#[tokio::test]
async fn test_persistence_failure_aborts_and_clears_flag() {
    let inner = MemoryProjectStore::new();
    let project = new_project(&inner).await;
    let source = Arc::new(ScriptedSource::default());
    let messages = MemoryMessageStore::new();
    let driver = PollDriver::new(
        Arc::new(FailingProjectStore {
            inner: inner.clone(),
        }),
        Arc::new(messages.clone()),
        Arc::new(MemoryObjectStorage::default()),
        Arc::new(FixedConnector(source.clone())),
        PollSettings::default(),
    );

    let err = driver
        .run(project.id, 5, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeodrillError::Storage(_)));
    assert_eq!(source.requested(), vec![0]);
    let stored = reload(&inner, project.id).await;
    assert!(!stored.polling_active);
    assert_eq!(stored.current_index, 0);
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_run_continues_from_stored_cursor() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    projects
        .update_project(
            project.id,
            &ProjectUpdate {
                current_index: Some(7),
                ..ProjectUpdate::default()
            },
        )
        .await
        .unwrap();
    let h = harness_with(projects, ScriptedSource::default());

    let summary = h
        .driver
        .run(project.id, 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(h.source.requested(), vec![7, 8]);
    assert_eq!(summary.final_index, 9);
    let points = reload(&h.projects, project.id).await.path().points;
    assert_eq!(points[0].iteration, 7);
    assert_eq!(points[1].iteration, 8);
}

#[tokio::test]
async fn test_inline_frame_is_published() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let mut result = vertical(0);
    result.frame_image_base64 = Some(PNG_DATA_URI.to_string());
    result.frame_path = Some("frames/ignored.png".to_string());
    let h = harness_with(projects, ScriptedSource::default().script(0, Script::Respond(result)));

    h.driver
        .run(project.id, 1, &CancellationToken::new())
        .await
        .unwrap();

    let keys = h.objects.keys();
    assert_eq!(keys.len(), 1);
    let prefix = format!("{}/frame_0_", project.id);
    assert!(keys[0].starts_with(&prefix));
    assert!(keys[0].ends_with(".png"));

    let url = h.objects.public_url(&keys[0]);
    let stored = reload(&h.projects, project.id).await;
    assert_eq!(stored.current_image_url.as_deref(), Some(url.as_str()));
    assert_eq!(stored.initial_image_url.as_deref(), Some(url.as_str()));

    let messages = log(&h.messages, project.id).await;
    assert_eq!(messages[0].image_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_frame_path_is_fetched() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;
    let mut result = vertical(0);
    result.frame_path = Some("frames/f0.jpg".to_string());
    let source = ScriptedSource::default()
        .script(0, Script::Respond(result))
        .frame("frames/f0.jpg", FramePayload::new(vec![0xff, 0xd8], "image/jpeg"));
    let h = harness_with(projects, source);

    h.driver
        .run(project.id, 1, &CancellationToken::new())
        .await
        .unwrap();

    let keys = h.objects.keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].ends_with(".jpg"));
    let object = h.objects.get_object(&keys[0]).unwrap();
    assert_eq!(object.bytes, vec![0xff, 0xd8]);
    assert_eq!(object.content_type, "image/jpeg");
}

#[tokio::test]
async fn test_frame_failure_keeps_previous_image() {
    let projects = MemoryProjectStore::new();
    let project = new_project(&projects).await;

    let mut first = vertical(0);
    first.frame_image_base64 = Some(PNG_DATA_URI.to_string());
    let mut second = vertical(1);
    second.frame_path = Some("frames/missing.png".to_string());

    let source = ScriptedSource::default()
        .script(0, Script::Respond(first))
        .script(1, Script::Respond(second));
    let h = harness_with(projects, source);

    let summary = h
        .driver
        .run(project.id, 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    let keys = h.objects.keys();
    assert_eq!(keys.len(), 1);

    let stored = reload(&h.projects, project.id).await;
    let first_url = h.objects.public_url(&keys[0]);
    assert_eq!(stored.current_image_url.as_deref(), Some(first_url.as_str()));
    assert_eq!(stored.path().points.len(), 2);

    let messages = log(&h.messages, project.id).await;
    assert!(messages[1].image_url.is_none());
}
