//! HTTP adapter for the drilling simulator

use async_trait::async_trait;
use geodrill_core::config::{DEFAULT_SOURCE_PATH_TEMPLATE, INDEX_PLACEHOLDER};
use geodrill_core::error::{GeodrillError, Result};
use geodrill_core::models::IterationResult;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::sync::Arc;

use crate::frame::{FramePayload, DEFAULT_FRAME_CONTENT_TYPE};
use crate::ports::{DrillingSource, SourceConnector};

/// Drilling source reached over HTTP
pub struct HttpDrillingSource {
    /// Base URL of the simulator, without trailing slash
    base_url: String,

    /// Path appended to the base URL, containing `{index}`
    path_template: String,

    client: reqwest::Client,
}

impl HttpDrillingSource {
    pub fn new(
        base_url: impl Into<String>,
        path_template: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            path_template: path_template.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL requested for source index `index`
    pub fn iteration_url(&self, index: u64) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.path_template.replace(INDEX_PLACEHOLDER, &index.to_string())
        )
    }

    /// URL of a frame image; absolute http(s) paths are used as given
    pub fn frame_url(&self, frame_path: &str) -> String {
        let frame_path = frame_path.trim();
        if frame_path.starts_with("http://") || frame_path.starts_with("https://") {
            return frame_path.to_string();
        }
        format!("{}/{}", self.base_url, frame_path.trim_start_matches('/'))
    }
}

#[async_trait]
impl DrillingSource for HttpDrillingSource {
    async fn fetch_iteration(&self, index: u64) -> Result<IterationResult> {
        let url = self.iteration_url(index);
        tracing::debug!(index, url = %url, "Requesting drilling data");

        let response = self.client.get(&url).send().await.map_err(|e| {
            GeodrillError::SourceUnavailable {
                reason: format!("Request to {} failed: {}", url, e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeodrillError::SourceStatus {
                index,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| GeodrillError::SourceResponse {
            index,
            reason: format!("Failed to read body: {}", e),
        })?;

        IterationResult::from_json(&body).map_err(|e| GeodrillError::SourceResponse {
            index,
            reason: e.to_string(),
        })
    }

    async fn fetch_frame(&self, frame_path: &str) -> Result<FramePayload> {
        let url = self.frame_url(frame_path);
        tracing::debug!(url = %url, "Downloading frame image");

        let response = self.client.get(&url).send().await.map_err(|e| GeodrillError::Frame {
            reason: format!("Request to {} failed: {}", url, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeodrillError::Frame {
                reason: format!("Frame request to {} returned HTTP {}", url, status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_FRAME_CONTENT_TYPE)
            .to_string();

        let bytes = response.bytes().await.map_err(|e| GeodrillError::Frame {
            reason: format!("Failed to read frame body: {}", e),
        })?;

        if bytes.is_empty() {
            return Err(GeodrillError::Frame {
                reason: format!("Frame at {} is empty", url),
            });
        }

        Ok(FramePayload::new(bytes.to_vec(), content_type))
    }
}

/// Builds [`HttpDrillingSource`]s sharing one HTTP client
#[derive(Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    path_template: String,
}

impl HttpConnector {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), path_template)
    }

    pub fn with_client(client: reqwest::Client, path_template: impl Into<String>) -> Self {
        Self {
            client,
            path_template: path_template.into(),
        }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_PATH_TEMPLATE)
    }
}

impl SourceConnector for HttpConnector {
    fn connect(&self, base_url: &str) -> Result<Arc<dyn DrillingSource>> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(GeodrillError::ConfigMissing {
                key: "external_api_url".to_string(),
            });
        }

        let parsed = Url::parse(trimmed).map_err(|e| GeodrillError::ConfigInvalid {
            key: "external_api_url".to_string(),
            reason: format!("'{}' is not a valid URL: {}", trimmed, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GeodrillError::ConfigInvalid {
                key: "external_api_url".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Arc::new(HttpDrillingSource::new(
            trimmed,
            self.path_template.clone(),
            self.client.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodrill_core::config::LEGACY_SOURCE_PATH_TEMPLATE;

    fn source(base: &str, template: &str) -> HttpDrillingSource {
        HttpDrillingSource::new(base, template, reqwest::Client::new())
    }

    #[test]
    fn test_iteration_url_default_template() {
        let s = source("http://sim.local:8000/", DEFAULT_SOURCE_PATH_TEMPLATE);
        assert_eq!(s.iteration_url(7), "http://sim.local:8000/drilling-data?index=7");
    }

    #[test]
    fn test_iteration_url_legacy_template() {
        let s = source("https://sim.example/api", LEGACY_SOURCE_PATH_TEMPLATE);
        assert_eq!(s.iteration_url(0), "https://sim.example/api?index=0");
    }

    #[test]
    fn test_frame_url() {
        let s = source("http://sim.local/", DEFAULT_SOURCE_PATH_TEMPLATE);
        assert_eq!(s.frame_url("frames/f1.png"), "http://sim.local/frames/f1.png");
        assert_eq!(s.frame_url("/frames/f1.png"), "http://sim.local/frames/f1.png");
        assert_eq!(
            s.frame_url("https://cdn.example/f1.png"),
            "https://cdn.example/f1.png"
        );
    }

    #[test]
    fn test_connect_validates_url() {
        let connector = HttpConnector::default();
        assert!(connector.connect("http://localhost:8000").is_ok());

        let missing = connector.connect("   ").err().unwrap();
        assert!(matches!(missing, GeodrillError::ConfigMissing { .. }));

        let invalid = connector.connect("not a url").err().unwrap();
        assert!(matches!(invalid, GeodrillError::ConfigInvalid { .. }));

        let scheme = connector.connect("ftp://sim.local").err().unwrap();
        assert!(matches!(scheme, GeodrillError::ConfigInvalid { .. }));
    }
}
