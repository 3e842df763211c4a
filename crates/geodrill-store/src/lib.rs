//! GeoDrill Store - Storage ports and adapters
//!
//! This crate defines the project, message and object storage ports used by
//! the poll worker, and provides in-memory, local filesystem and PostgreSQL
//! adapters for them.

pub mod local;
pub mod memory;
pub mod ports;
pub mod postgres;

pub use local::LocalObjectStorage;
pub use memory::{MemoryMessageStore, MemoryObjectStorage, MemoryProjectStore};
pub use ports::{MessageStore, ObjectStorage, ProjectStore};
