use geodrill_core::config::LayeredConfig;
use geodrill_poller::PollDriver;
use geodrill_store::{MessageStore, ProjectStore};
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::RunRegistry;

#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<dyn ProjectStore>,
    pub messages: Arc<dyn MessageStore>,
    pub driver: PollDriver,
    pub runs: RunRegistry,
    pub worker_config: LayeredConfig,
    /// Directory served under `/objects`, when frames are stored locally
    pub object_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        messages: Arc<dyn MessageStore>,
        driver: PollDriver,
        worker_config: LayeredConfig,
    ) -> Self {
        Self {
            projects,
            messages,
            driver,
            runs: RunRegistry::new(),
            worker_config,
            object_root: None,
        }
    }

    pub fn with_object_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.object_root = Some(root.into());
        self
    }
}
