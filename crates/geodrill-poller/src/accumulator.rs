//! Folds iteration results into a project's drilling path and metrics

use geodrill_core::models::{
    DrillingPath, DrillingPoint, IterationResult, Metrics, ObstaclePosition, PathStatus,
    DEFAULT_LITHOLOGY,
};
use geodrill_core::trajectory::{next_point, StepVector, DEFAULT_FALLBACK_STEP};

/// Path and metrics after one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedStep {
    pub path: DrillingPath,
    pub point: DrillingPoint,
    pub step: StepVector,
    pub metrics: Metrics,
}

/// Converts directional actions into path points
#[derive(Debug, Clone, Copy)]
pub struct PathAccumulator {
    fallback_step: f64,
}

impl PathAccumulator {
    pub fn new(fallback_step: f64) -> Self {
        Self { fallback_step }
    }

    pub fn fallback_step(&self) -> f64 {
        self.fallback_step
    }

    /// Append the point produced by `result` to a copy of `path`.
    ///
    /// Existing points are carried over untouched. Reported metrics replace
    /// the previous ones; absent values keep them.
    pub fn apply(
        &self,
        path: &DrillingPath,
        metrics: Metrics,
        result: &IterationResult,
        cursor: u64,
    ) -> AccumulatedStep {
        let previous = path.last_point().cloned().unwrap_or_else(DrillingPoint::origin);
        let step = StepVector::from_action(result.action.as_ref(), self.fallback_step);
        let lithology = result
            .observed_lithology
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LITHOLOGY);

        let point = next_point(&previous, &step, cursor, lithology);

        let mut next = path.clone();
        next.points.push(point.clone());
        next.status = match &result.action {
            Some(action) if action.is_drill() => PathStatus::Drilling,
            _ => PathStatus::Stopped,
        };

        let obstacle = result.obstacle();
        if obstacle.detected {
            next.obstacle_detected = true;
            next.obstacle_position = Some(obstacle.position.unwrap_or(ObstaclePosition {
                x: point.x,
                y: point.y,
                depth: point.depth,
            }));
        }

        let metrics = metrics.merge_reported(
            result.current_md,
            result.precision_improvement,
            result.image_quality,
        );

        AccumulatedStep {
            path: next,
            point,
            step,
            metrics,
        }
    }
}

impl Default for PathAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodrill_core::models::DrillingAction;
    use proptest::prelude::*;

    fn drill(step: f64, inc: f64, az: f64) -> IterationResult {
        IterationResult {
            action: Some(DrillingAction {
                step_md: Some(step),
                inclination: Some(inc),
                azimuth: Some(az),
                kind: Some("drill".to_string()),
            }),
            observed_lithology: Some("Limestone".to_string()),
            ..IterationResult::default()
        }
    }

    #[test]
    fn test_first_point_starts_at_origin() {
        let acc = PathAccumulator::default();
        let out = acc.apply(&DrillingPath::new(), Metrics::floor(), &drill(10.0, 0.0, 0.0), 0);

        assert_eq!(out.path.points.len(), 1);
        assert_eq!(out.point.depth, 10.0);
        assert_eq!(out.point.x, 0.0);
        assert_eq!(out.point.iteration, 0);
        assert_eq!(out.point.lithology, "Limestone");
        assert_eq!(out.path.status, PathStatus::Drilling);
    }

    #[test]
    fn test_absent_action_uses_fallback_and_stops() {
        let acc = PathAccumulator::new(10.0);
        let first = acc.apply(&DrillingPath::new(), Metrics::floor(), &drill(10.0, 90.0, 0.0), 4);
        let second = acc.apply(&first.path, first.metrics, &IterationResult::default(), 5);

        assert_eq!(second.path.points.len(), 2);
        assert_eq!(second.point.x, first.point.x);
        assert_eq!(second.point.y, first.point.y);
        assert!((second.point.depth - first.point.depth - 10.0).abs() < 1e-9);
        assert_eq!(second.point.lithology, DEFAULT_LITHOLOGY);
        assert_eq!(second.path.status, PathStatus::Stopped);
        assert_eq!(second.path.points[0], first.point);
    }

    #[test]
    fn test_authoritative_metrics_win() {
        let acc = PathAccumulator::default();
        let previous = Metrics {
            meters_drilled: 50.0,
            precision_improvement: 12.0,
            image_quality: 40.0,
        };
        let mut result = drill(10.0, 0.0, 0.0);
        result.current_md = Some(65.0);
        result.image_quality = Some(180.0);

        let out = acc.apply(&DrillingPath::new(), previous, &result, 0);

        assert_eq!(out.metrics.meters_drilled, 65.0);
        assert_eq!(out.metrics.precision_improvement, 12.0);
        assert_eq!(out.metrics.image_quality, 100.0);
    }

    #[test]
    fn test_obstacle_without_position_uses_new_point() {
        let acc = PathAccumulator::default();
        let mut result = drill(10.0, 0.0, 0.0);
        result.obstacle_detected = Some(true);

        let out = acc.apply(&DrillingPath::new(), Metrics::floor(), &result, 0);

        assert!(out.path.obstacle_detected);
        assert_eq!(
            out.path.obstacle_position,
            Some(ObstaclePosition {
                x: 0.0,
                y: 0.0,
                depth: 10.0
            })
        );
    }

    #[test]
    fn test_stop_action_sets_stopped() {
        let acc = PathAccumulator::default();
        let mut result = drill(5.0, 0.0, 0.0);
        if let Some(action) = result.action.as_mut() {
            action.kind = Some("stop".to_string());
        }

        let out = acc.apply(&DrillingPath::new(), Metrics::floor(), &result, 0);
        assert_eq!(out.path.status, PathStatus::Stopped);
        assert_eq!(out.point.depth, 5.0);
    }

    proptest! {
        #[test]
        fn prop_points_append_only(
            steps in proptest::collection::vec((0.0f64..100.0, -30.0f64..120.0, 0.0f64..360.0), 1..20)
        ) {
            let acc = PathAccumulator::default();
            let mut path = DrillingPath::new();
            let mut metrics = Metrics::floor();

            for (i, (step, inc, az)) in steps.iter().enumerate() {
                let before = path.points.clone();
                let out = acc.apply(&path, metrics, &drill(*step, *inc, *az), i as u64);

                prop_assert_eq!(out.path.points.len(), before.len() + 1);
                prop_assert_eq!(&out.path.points[..before.len()], &before[..]);
                if let Some(last) = before.last() {
                    prop_assert!(out.point.depth >= last.depth - 1e-9);
                }

                path = out.path;
                metrics = out.metrics;
            }

            prop_assert_eq!(path.points.len(), steps.len());
        }
    }
}
