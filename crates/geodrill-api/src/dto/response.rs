use geodrill_core::models::{DrillingPath, Project, ProjectId};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            service: "geodrill-api".to_string(),
        }
    }
}

/// Project record plus derived path figures
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,
    pub point_count: usize,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        let point_count = project.drilling_path_data.as_ref().map_or(0, |p| p.points.len());
        Self {
            project,
            point_count,
        }
    }
}

/// Accumulated trajectory of a project
#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub project_id: ProjectId,
    pub point_count: usize,
    pub measured_length: f64,
    pub max_depth: f64,
    pub path: DrillingPath,
}

impl PathResponse {
    pub fn from_project(project: &Project) -> Self {
        let path = project.path();
        Self {
            project_id: project.id,
            point_count: path.points.len(),
            measured_length: path.measured_length(),
            max_depth: path.max_depth(),
            path,
        }
    }
}
