//! GeoDrill Poller - Background polling worker
//!
//! The [`PollDriver`] runs a bounded number of iterations against a
//! project's drilling source. Each successful iteration is folded into the
//! project's path by the [`PathAccumulator`], its frame image is published
//! through the [`FramePipeline`], and the updated project plus one activity
//! message are written back to the store.

pub mod accumulator;
pub mod driver;
pub mod frames;
pub mod reset;
pub mod summary;

pub use accumulator::{AccumulatedStep, PathAccumulator};
pub use driver::{IterationReport, PollDriver, PollObserver, PollSettings, PreparedRun};
pub use frames::{frame_object_key, FramePipeline};
pub use reset::reset_project;
pub use summary::{IterationError, RunSummary, StopReason};
pub use tokio_util::sync::CancellationToken;
