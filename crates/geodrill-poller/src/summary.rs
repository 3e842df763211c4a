use geodrill_core::models::Metrics;
use serde::Serialize;

/// Why a polling run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All requested iterations were attempted
    Exhausted,
    /// The polling flag was cleared or the run's token was cancelled
    Cancelled,
}

/// A skipped iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationError {
    /// Position within the run, starting at 0
    pub iteration: u32,
    /// Source index that was requested
    pub index: u64,
    pub message: String,
}

/// Outcome of a polling run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub requested: u32,
    pub attempted: u32,
    pub succeeded: u32,
    pub errors: Vec<IterationError>,
    pub stop_reason: StopReason,
    /// Persisted `current_index` after the run
    pub final_index: u64,
    pub metrics: Metrics,
    pub point_count: usize,
}

impl RunSummary {
    pub(crate) fn start(requested: u32, base_index: u64, metrics: Metrics, point_count: usize) -> Self {
        Self {
            requested,
            attempted: 0,
            succeeded: 0,
            errors: Vec::new(),
            stop_reason: StopReason::Exhausted,
            final_index: base_index,
            metrics,
            point_count,
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }
}
