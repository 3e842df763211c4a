//! Frame image payloads
//!
//! Inline frames arrive either as a data URI
//! (`data:image/png;base64,iVBOR...`) or as bare base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use geodrill_core::error::{GeodrillError, Result};

/// Content type assumed when a payload does not declare an image type
pub const DEFAULT_FRAME_CONTENT_TYPE: &str = "image/png";

/// Decoded frame image
#[derive(Debug, Clone, PartialEq)]
pub struct FramePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl FramePayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: normalize_content_type(&content_type.into()),
        }
    }

    /// File extension matching the content type
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Reduce a content type header to its image mime type, defaulting to PNG
pub fn normalize_content_type(raw: &str) -> String {
    let mime = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime.starts_with("image/") && mime.len() > "image/".len() {
        mime
    } else {
        DEFAULT_FRAME_CONTENT_TYPE.to_string()
    }
}

/// Decode an inline frame given as a data URI or bare base64
pub fn decode_inline_frame(payload: &str) -> Result<FramePayload> {
    let trimmed = payload.trim();

    let (content_type, data) = match trimmed.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest.split_once(',').ok_or_else(|| GeodrillError::Frame {
                reason: "data URI has no payload".to_string(),
            })?;
            let mut params = meta.split(';');
            let mime = params.next().unwrap_or_default();
            if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(GeodrillError::Frame {
                    reason: "data URI is not base64 encoded".to_string(),
                });
            }
            (mime, data)
        }
        None => (DEFAULT_FRAME_CONTENT_TYPE, trimmed),
    };

    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned.as_bytes()).map_err(|e| GeodrillError::Frame {
        reason: format!("Invalid base64 frame: {}", e),
    })?;

    if bytes.is_empty() {
        return Err(GeodrillError::Frame {
            reason: "Frame payload is empty".to_string(),
        });
    }

    Ok(FramePayload::new(bytes, content_type))
}
