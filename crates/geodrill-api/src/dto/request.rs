use serde::Deserialize;

/// Create project request
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub external_api_url: Option<String>,
    #[serde(default)]
    pub polling_interval: Option<u64>,
}

/// Partial project update; an empty `external_api_url` clears it
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_api_url: Option<String>,
    #[serde(default)]
    pub polling_interval: Option<u64>,
}

/// Start polling request, in the dashboard's wire casing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPollingRequest {
    pub project_id: String,
    #[serde(default)]
    pub iterations: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPollingRequest {
    pub project_id: String,
}

/// Message listing query parameters
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Keep only the most recent `limit` messages
    #[serde(default)]
    pub limit: Option<usize>,
}
