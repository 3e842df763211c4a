//! Object storage backed by a local directory.
//!
//! Objects are written to `<root>/<bucket>/<key>` and published as
//! `<public_base_url>/<bucket>/<key>`; the API serves the root directory so
//! the published URLs resolve.

use async_trait::async_trait;
use geodrill_core::error::{GeodrillError, Result};
use std::path::{Component, Path, PathBuf};

use crate::ports::ObjectStorage;

/// Filesystem implementation of ObjectStorage
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve `key` inside the bucket directory, rejecting keys that would escape it
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(GeodrillError::Storage(format!("Invalid object key: {}", key)));
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn store_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(
            key = %key,
            content_type = %content_type,
            size = bytes.len(),
            "Stored object"
        );

        Ok(self.public_url(key))
    }
}
