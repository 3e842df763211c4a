//! Error types for GeoDrill

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeodrillError {
    // Project errors
    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Polling is already active for project {id}")]
    PollingActive { id: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Drilling data source errors
    #[error("Drilling source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Drilling source returned HTTP {status} for index {index}")]
    SourceStatus { index: u64, status: u16 },

    #[error("Invalid drilling source response for index {index}: {reason}")]
    SourceResponse { index: u64, reason: String },

    // Frame image errors
    #[error("Frame image error: {reason}")]
    Frame { reason: String },

    // Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used to decide whether a failure ends a polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Source,
    Frame,
    Persistence,
    Conflict,
    NotFound,
}

impl GeodrillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeodrillError::ProjectNotFound { .. } => ErrorKind::NotFound,
            GeodrillError::PollingActive { .. } => ErrorKind::Conflict,
            GeodrillError::ConfigMissing { .. } | GeodrillError::ConfigInvalid { .. } => {
                ErrorKind::Configuration
            }
            GeodrillError::SourceUnavailable { .. }
            | GeodrillError::SourceStatus { .. }
            | GeodrillError::SourceResponse { .. } => ErrorKind::Source,
            GeodrillError::Frame { .. } => ErrorKind::Frame,
            GeodrillError::Storage(_) | GeodrillError::Io(_) | GeodrillError::Serialization(_) => {
                ErrorKind::Persistence
            }
        }
    }
}

impl From<serde_json::Error> for GeodrillError {
    fn from(err: serde_json::Error) -> Self {
        GeodrillError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeodrillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let missing = GeodrillError::ConfigMissing {
            key: "external_api_url".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Configuration);

        let status = GeodrillError::SourceStatus { index: 4, status: 500 };
        assert_eq!(status.kind(), ErrorKind::Source);
        assert_eq!(status.to_string(), "Drilling source returned HTTP 500 for index 4");

        assert_eq!(GeodrillError::Storage("down".into()).kind(), ErrorKind::Persistence);
    }
}
