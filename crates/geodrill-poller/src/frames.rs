//! Frame image retrieval and publication

use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::{IterationResult, ProjectId};
use geodrill_source::{decode_inline_frame, DrillingSource, FramePayload};
use geodrill_store::ObjectStorage;
use std::sync::Arc;

/// Object key for a frame: `<project_id>/frame_<index>_<timestamp_ms>.<ext>`
pub fn frame_object_key(
    project_id: ProjectId,
    index: u64,
    timestamp_ms: i64,
    extension: &str,
) -> String {
    format!("{}/frame_{}_{}.{}", project_id, index, timestamp_ms, extension)
}

/// Obtains frame bytes for an iteration and stores them in object storage
#[derive(Clone)]
pub struct FramePipeline {
    objects: Arc<dyn ObjectStorage>,
}

impl FramePipeline {
    pub fn new(objects: Arc<dyn ObjectStorage>) -> Self {
        Self { objects }
    }

    /// Publish the frame referenced by `result`, returning its public URL.
    ///
    /// Returns `None` when the result has no frame or when retrieval or
    /// storage fails; failures are logged and never surface as errors.
    pub async fn publish(
        &self,
        project_id: ProjectId,
        index: u64,
        result: &IterationResult,
        source: &dyn DrillingSource,
    ) -> Option<String> {
        if !result.has_frame() {
            return None;
        }

        match self.store(project_id, index, result, source).await {
            Ok(url) => {
                tracing::info!(project_id = %project_id, index, url = %url, "Frame image published");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(
                    project_id = %project_id,
                    index,
                    error = %e,
                    "Frame image not published, keeping previous image"
                );
                None
            }
        }
    }

    async fn store(
        &self,
        project_id: ProjectId,
        index: u64,
        result: &IterationResult,
        source: &dyn DrillingSource,
    ) -> Result<String> {
        let frame = retrieve(result, source).await?;
        let key = frame_object_key(
            project_id,
            index,
            chrono::Utc::now().timestamp_millis(),
            frame.extension(),
        );
        self.objects
            .store_object(&key, frame.bytes, &frame.content_type)
            .await
    }
}

/// Inline payloads win over `frame_path`; the path is still tried when the
/// inline payload cannot be decoded.
async fn retrieve(result: &IterationResult, source: &dyn DrillingSource) -> Result<FramePayload> {
    let inline = result
        .frame_image_base64
        .as_deref()
        .filter(|s| !s.trim().is_empty());
    let path = result.frame_path.as_deref().filter(|s| !s.trim().is_empty());

    if let Some(inline) = inline {
        match decode_inline_frame(inline) {
            Ok(frame) => return Ok(frame),
            Err(e) if path.is_some() => {
                tracing::debug!(error = %e, "Inline frame unreadable, fetching frame_path");
            }
            Err(e) => return Err(e),
        }
    }

    match path {
        Some(path) => source.fetch_frame(path).await,
        None => Err(GeodrillError::Frame {
            reason: "Result has no frame reference".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_object_key() {
        let id: ProjectId = "6f1c1a52-3f43-4c49-9a55-0d8c3b2f8e11".parse().unwrap();
        assert_eq!(
            frame_object_key(id, 12, 1_700_000_000_123, "png"),
            "6f1c1a52-3f43-4c49-9a55-0d8c3b2f8e11/frame_12_1700000000123.png"
        );
    }
}
