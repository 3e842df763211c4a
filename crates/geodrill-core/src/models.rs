pub mod iteration;
pub mod message;
pub mod path;
pub mod project;

pub use iteration::{DrillingAction, IterationResult, ObstacleReport};
pub use message::{ChatMessage, MessageId, MessageRole, NewMessage};
pub use path::{DrillingPath, DrillingPoint, ObstaclePosition, PathStatus, DEFAULT_LITHOLOGY};
pub use project::{Metrics, NewProject, Project, ProjectId, ProjectUpdate};
