use serde::{Deserialize, Serialize};

/// Label attached to a point when the source did not report a lithology
pub const DEFAULT_LITHOLOGY: &str = "Unknown";

/// One sample of the drilled trajectory.
///
/// `x` and `y` are the planar offsets from the wellhead, `depth` grows
/// downwards. Points are immutable once appended to a [`DrillingPath`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillingPoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,

    /// Absolute source index (cursor) that produced this point
    pub iteration: u64,

    /// Lithology observed at this step
    pub lithology: String,
}

impl DrillingPoint {
    /// The wellhead, used as the previous point of an empty path
    pub fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            depth: 0.0,
            iteration: 0,
            lithology: DEFAULT_LITHOLOGY.to_string(),
        }
    }

    /// Straight-line distance to another point
    pub fn distance_to(&self, other: &DrillingPoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.depth - self.depth;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Drilling state reported alongside the path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    #[default]
    InProgress,
    Drilling,
    Stopped,
}

/// Position reported for a detected obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePosition {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

/// Accumulated drilling trajectory of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrillingPath {
    /// Points in drilling order; append-only during a polling run
    #[serde(default)]
    pub points: Vec<DrillingPoint>,

    #[serde(default)]
    pub status: PathStatus,

    #[serde(default)]
    pub obstacle_detected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_position: Option<ObstaclePosition>,
}

impl DrillingPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_point(&self) -> Option<&DrillingPoint> {
        self.points.last()
    }

    /// Total length along the trajectory, starting at the wellhead
    pub fn measured_length(&self) -> f64 {
        let mut previous = DrillingPoint::origin();
        let mut total = 0.0;
        for point in &self.points {
            total += previous.distance_to(point);
            previous = point.clone();
        }
        total
    }

    /// Deepest point reached so far
    pub fn max_depth(&self) -> f64 {
        self.points.iter().map(|p| p.depth).fold(0.0, f64::max)
    }
}
