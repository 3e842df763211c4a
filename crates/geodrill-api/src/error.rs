use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use geodrill_core::error::{ErrorKind, GeodrillError};
use serde::Serialize;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GeodrillError> for ApiError {
    fn from(err: GeodrillError) -> Self {
        let details = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::not_found("Project not found").with_details(details),
            ErrorKind::Conflict => Self::conflict("Polling is active").with_details(details),
            ErrorKind::Configuration => {
                Self::bad_request("Invalid configuration").with_details(details)
            }
            ErrorKind::Source | ErrorKind::Frame => {
                Self::bad_gateway("Drilling source error").with_details(details)
            }
            ErrorKind::Persistence => Self::internal("Storage error").with_details(details),
        }
    }
}
