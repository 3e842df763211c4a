//! GeoDrill Core - Domain models, trajectory math, and configuration
//!
//! This crate contains the domain types shared by the store, source, poller
//! and API crates, plus the spherical-to-Cartesian step integration used to
//! grow a drilling path.

pub mod config;
pub mod error;
pub mod models;
pub mod trajectory;

pub use error::{ErrorKind, GeodrillError, Result};
