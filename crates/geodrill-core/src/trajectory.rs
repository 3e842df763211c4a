//! Step integration for drilling trajectories
//!
//! Each simulator step is a measured-depth length plus two angles:
//! inclination (from vertical) and azimuth (in the horizontal plane).
//! The step splits into a vertical part `step * cos(inc)` added to depth and
//! a horizontal part `step * sin(inc)` which azimuth divides between the two
//! planar axes: `x` takes the `cos(az)` share and `y` the `sin(az)` share.

use crate::models::{DrillingAction, DrillingPoint};

/// Depth increment applied when a step length is missing or unusable
pub const DEFAULT_FALLBACK_STEP: f64 = 10.0;

/// Inclinations above horizontal would drill upwards
pub const MAX_INCLINATION_DEG: f64 = 90.0;

/// Change of position produced by one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
    pub ddepth: f64,
}

/// A step with all fields resolved to usable values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepVector {
    pub step_md: f64,
    pub inclination_deg: f64,
    pub azimuth_deg: f64,
}

impl StepVector {
    /// Straight down by `step_md`
    pub fn vertical(step_md: f64) -> Self {
        Self {
            step_md,
            inclination_deg: 0.0,
            azimuth_deg: 0.0,
        }
    }

    /// Resolve a reported action, substituting defaults for missing or
    /// malformed fields. A zero, negative or non-finite step counts as
    /// missing. An absent action drills `fallback_step` straight down.
    pub fn from_action(action: Option<&DrillingAction>, fallback_step: f64) -> Self {
        let Some(action) = action else {
            return Self::vertical(fallback_step);
        };

        let step_md = match action.step_md {
            Some(step) if step.is_finite() && step > 0.0 => step,
            _ => fallback_step,
        };

        let inclination_deg = match action.inclination {
            Some(inc) if inc.is_finite() => inc.clamp(0.0, MAX_INCLINATION_DEG),
            _ => 0.0,
        };

        let azimuth_deg = match action.azimuth {
            Some(az) if az.is_finite() => az,
            _ => 0.0,
        };

        Self {
            step_md,
            inclination_deg,
            azimuth_deg,
        }
    }

    pub fn displacement(&self) -> Displacement {
        let inclination = self.inclination_deg.to_radians();
        let azimuth = self.azimuth_deg.to_radians();

        let vertical = self.step_md * inclination.cos();
        let horizontal = self.step_md * inclination.sin();

        Displacement {
            dx: horizontal * azimuth.cos(),
            dy: horizontal * azimuth.sin(),
            ddepth: vertical,
        }
    }
}

/// Compute the point reached from `previous` after one step
pub fn next_point(
    previous: &DrillingPoint,
    step: &StepVector,
    iteration: u64,
    lithology: impl Into<String>,
) -> DrillingPoint {
    let d = step.displacement();
    DrillingPoint {
        x: previous.x + d.dx,
        y: previous.y + d.dy,
        depth: previous.depth + d.ddepth,
        iteration,
        lithology: lithology.into(),
    }
}
