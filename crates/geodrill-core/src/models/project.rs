use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::path::DrillingPath;
use crate::error::GeodrillError;

/// Seconds between polling iterations for new projects
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;

/// Unique identifier for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = GeodrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(ProjectId).map_err(|e| GeodrillError::ConfigInvalid {
            key: "project_id".to_string(),
            reason: format!("'{}' is not a valid project ID: {}", s, e),
        })
    }
}

/// Progress metrics of a project, each kept inside its documented range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Cumulative measured depth, in [0, +inf)
    pub meters_drilled: f64,

    /// Precision gain in percent, in [0, 100]
    pub precision_improvement: f64,

    /// Frame image quality in percent, in [0, 100]
    pub image_quality: f64,
}

impl Metrics {
    pub const PERCENT_MAX: f64 = 100.0;

    /// Values of a fresh or reset project
    pub fn floor() -> Self {
        Self::default()
    }

    /// Bring every metric back into range; non-finite values fall to the floor
    pub fn clamped(self) -> Self {
        Self {
            meters_drilled: clamp_or_floor(self.meters_drilled, f64::INFINITY),
            precision_improvement: clamp_or_floor(self.precision_improvement, Self::PERCENT_MAX),
            image_quality: clamp_or_floor(self.image_quality, Self::PERCENT_MAX),
        }
    }

    /// Replace each metric with the reported value when one is present and finite
    pub fn merge_reported(
        self,
        meters_drilled: Option<f64>,
        precision_improvement: Option<f64>,
        image_quality: Option<f64>,
    ) -> Self {
        let pick = |reported: Option<f64>, current: f64| match reported {
            Some(v) if v.is_finite() => v,
            _ => current,
        };

        Self {
            meters_drilled: pick(meters_drilled, self.meters_drilled),
            precision_improvement: pick(precision_improvement, self.precision_improvement),
            image_quality: pick(image_quality, self.image_quality),
        }
        .clamped()
    }
}

fn clamp_or_floor(value: f64, max: f64) -> f64 {
    if !value.is_finite() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// Project record shared between the dashboard and the poll worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,

    /// Next source index to request; never decreases
    pub current_index: u64,

    pub meters_drilled: f64,
    pub precision_improvement: f64,
    pub image_quality: f64,

    pub initial_image_url: Option<String>,
    pub current_image_url: Option<String>,

    /// Base address of the drilling data source
    pub external_api_url: Option<String>,

    /// Set while a polling run owns the project; clearing it stops the run
    pub polling_active: bool,

    /// Seconds to wait between iterations
    pub polling_interval: u64,

    pub drilling_path_data: Option<DrillingPath>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Build a fresh project with an empty path and floor metrics
    pub fn create(id: ProjectId, new: &NewProject) -> Self {
        let now = Utc::now();
        let metrics = Metrics::floor();
        Self {
            id,
            name: new.name.clone(),
            current_index: 0,
            meters_drilled: metrics.meters_drilled,
            precision_improvement: metrics.precision_improvement,
            image_quality: metrics.image_quality,
            initial_image_url: None,
            current_image_url: None,
            external_api_url: new.external_api_url.clone(),
            polling_active: false,
            polling_interval: new.polling_interval,
            drilling_path_data: Some(DrillingPath::new()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            meters_drilled: self.meters_drilled,
            precision_improvement: self.precision_improvement,
            image_quality: self.image_quality,
        }
    }

    /// Current path, or an empty one when the path was reset
    pub fn path(&self) -> DrillingPath {
        self.drilling_path_data.clone().unwrap_or_default()
    }

    pub fn polling_delay(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: &ProjectUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(url) = &update.external_api_url {
            self.external_api_url = url.clone();
        }
        if let Some(interval) = update.polling_interval {
            self.polling_interval = interval;
        }
        if let Some(index) = update.current_index {
            self.current_index = index;
        }
        if let Some(metrics) = update.metrics {
            self.meters_drilled = metrics.meters_drilled;
            self.precision_improvement = metrics.precision_improvement;
            self.image_quality = metrics.image_quality;
        }
        if let Some(url) = &update.initial_image_url {
            self.initial_image_url = url.clone();
        }
        if let Some(url) = &update.current_image_url {
            self.current_image_url = url.clone();
        }
        if let Some(active) = update.polling_active {
            self.polling_active = active;
        }
        if let Some(path) = &update.drilling_path_data {
            self.drilling_path_data = path.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a project
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub external_api_url: Option<String>,
    pub polling_interval: u64,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_api_url: None,
            polling_interval: DEFAULT_POLLING_INTERVAL_SECS,
        }
    }

    pub fn with_external_api_url(mut self, url: impl Into<String>) -> Self {
        self.external_api_url = Some(url.into());
        self
    }

    pub fn with_polling_interval(mut self, seconds: u64) -> Self {
        self.polling_interval = seconds;
        self
    }
}

/// Partial field set written to a project; `None` leaves a field untouched.
///
/// Nullable columns use `Option<Option<_>>` so that `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub external_api_url: Option<Option<String>>,
    pub polling_interval: Option<u64>,
    pub current_index: Option<u64>,
    pub metrics: Option<Metrics>,
    pub initial_image_url: Option<Option<String>>,
    pub current_image_url: Option<Option<String>>,
    pub polling_active: Option<bool>,
    pub drilling_path_data: Option<Option<DrillingPath>>,
}

impl ProjectUpdate {
    /// Only toggle the polling flag
    pub fn polling(active: bool) -> Self {
        Self {
            polling_active: Some(active),
            ..Self::default()
        }
    }

    /// Clear the path, floor the metrics and unset the current image
    pub fn reset() -> Self {
        Self {
            metrics: Some(Metrics::floor()),
            current_image_url: Some(None),
            drilling_path_data: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_clamped() {
        let metrics = Metrics {
            meters_drilled: -5.0,
            precision_improvement: 140.0,
            image_quality: f64::NAN,
        }
        .clamped();

        assert_eq!(metrics.meters_drilled, 0.0);
        assert_eq!(metrics.precision_improvement, 100.0);
        assert_eq!(metrics.image_quality, 0.0);
    }

    #[test]
    fn test_merge_reported_authoritative_wins() {
        let previous = Metrics {
            meters_drilled: 40.0,
            precision_improvement: 10.0,
            image_quality: 55.0,
        };

        let merged = previous.merge_reported(Some(52.5), None, Some(f64::INFINITY));
        assert_eq!(merged.meters_drilled, 52.5);
        assert_eq!(merged.precision_improvement, 10.0);
        assert_eq!(merged.image_quality, 55.0);
    }

    #[test]
    fn test_reset_update_applies() {
        let mut project = Project::create(
            ProjectId::new(),
            &NewProject::new("Well A").with_external_api_url("http://sim.local"),
        );
        project.current_index = 7;
        project.meters_drilled = 70.0;
        project.current_image_url = Some("http://img/1.png".to_string());

        project.apply(&ProjectUpdate::reset());

        assert!(project.drilling_path_data.is_none());
        assert!(project.path().points.is_empty());
        assert_eq!(project.metrics(), Metrics::floor());
        assert!(project.current_image_url.is_none());
        assert_eq!(project.current_index, 7);
        assert_eq!(project.external_api_url.as_deref(), Some("http://sim.local"));
    }

    #[test]
    fn test_project_id_parse() {
        let id = ProjectId::new();
        let parsed: ProjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ProjectId>().is_err());
    }

    #[test]
    fn test_empty_update() {
        assert!(ProjectUpdate::default().is_empty());
        assert!(!ProjectUpdate::polling(false).is_empty());
    }
}
