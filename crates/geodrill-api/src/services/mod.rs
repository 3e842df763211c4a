mod polling;

pub use polling::{PollingService, RunRecord, RunRegistry, RunStatus, StopOutcome};
