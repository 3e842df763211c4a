//! GeoDrill Source - Drilling simulator client
//!
//! This crate defines the port through which the poll worker reads
//! iteration results and frame images from the external drilling simulator,
//! along with the reqwest-based HTTP adapter.

pub mod frame;
pub mod http;
pub mod ports;

pub use frame::{decode_inline_frame, FramePayload, DEFAULT_FRAME_CONTENT_TYPE};
pub use http::{HttpConnector, HttpDrillingSource};
pub use ports::{DrillingSource, SourceConnector};
