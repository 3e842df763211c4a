//! Drilling source port definitions

use async_trait::async_trait;
use geodrill_core::error::Result;
use geodrill_core::models::IterationResult;
use std::sync::Arc;

use crate::frame::FramePayload;

/// Port for a project's drilling data source
#[async_trait]
pub trait DrillingSource: Send + Sync {
    /// Request the result for source index `index`
    async fn fetch_iteration(&self, index: u64) -> Result<IterationResult>;

    /// Download the frame image referenced by a result's `frame_path`
    async fn fetch_frame(&self, frame_path: &str) -> Result<FramePayload>;
}

/// Opens a [`DrillingSource`] for a project's external API URL
pub trait SourceConnector: Send + Sync {
    /// Validate `base_url` and build a source for it.
    ///
    /// Fails with a configuration error when the URL cannot be used.
    fn connect(&self, base_url: &str) -> Result<Arc<dyn DrillingSource>>;
}
