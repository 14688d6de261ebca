//! Image encoding: raw bytes → base64 [`ImageData`].
//!
//! Vision APIs take images as base64 strings embedded in the JSON request
//! body, tagged with their media type. Bytes are encoded exactly as uploaded
//! (or as produced by [`super::normalize`]); nothing is re-compressed here.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A base64-encoded image ready to embed in a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Standard base64 (with padding) of the image bytes.
    pub data: String,
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }
}

/// Base64-encode image bytes for the vision model.
pub fn encode_image(bytes: &[u8], media_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", media_type, b64.len());
    ImageData::new(b64, media_type)
}
