//! Receipt extraction: upload → normalised image → vision model → JSON.
//!
//! ```text
//! upload ──▶ check ──▶ normalize ──▶ encode ──▶ llm ──▶ postprocess ──▶ JSON
//!           (image?)   (HEIC→JPEG)   (base64)   (VLM)    (fences)
//! ```
//!
//! The parsed JSON is returned exactly as the model produced it. It usually
//! matches [`crate::bill::BillData`], but nothing enforces that; callers must
//! cope with a missing `tax` or extra fields.

use crate::error::BillSplitError;
use crate::pipeline::{encode, llm::VisionModel, normalize, postprocess};
use crate::prompts::RECEIPT_EXTRACTION_PROMPT;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// An uploaded file, as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// Reject uploads that are not images.
///
/// A file named `*.heic`/`*.heif` counts as an image whatever content type the
/// browser declared; many browsers do not know the HEIC MIME type.
pub fn ensure_image(content_type: &str, filename: Option<&str>) -> Result<(), BillSplitError> {
    if content_type.trim().to_ascii_lowercase().starts_with("image/")
        || normalize::is_heif(content_type, filename)
    {
        Ok(())
    } else {
        Err(BillSplitError::InvalidInput("File must be an image".into()))
    }
}

/// Full `/parse-bill` pipeline for one upload.
pub async fn parse_receipt(
    model: &dyn VisionModel,
    upload: Upload,
    jpeg_quality: u8,
) -> Result<Value, BillSplitError> {
    ensure_image(&upload.content_type, upload.filename.as_deref())?;

    let normalized =
        normalize::normalize(upload.bytes, upload.content_type, upload.filename, jpeg_quality)
            .await?;

    extract_bill(model, &normalized.bytes, &normalized.media_type).await
}

/// Ask the vision model to read an already-normalised receipt image.
pub async fn extract_bill(
    model: &dyn VisionModel,
    bytes: &[u8],
    media_type: &str,
) -> Result<Value, BillSplitError> {
    if !media_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(BillSplitError::InvalidInput("File must be an image".into()));
    }

    let start = Instant::now();
    let image = encode::encode_image(bytes, media_type);
    let raw = model.describe(&image, RECEIPT_EXTRACTION_PROMPT).await?;
    debug!("{} replied with {} chars", model.name(), raw.len());

    let bill = parse_reply(&raw)?;
    let item_count = bill
        .get("items")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);
    info!(
        "Extracted {} items via {} in {:?}",
        item_count,
        model.name(),
        start.elapsed()
    );
    Ok(bill)
}

/// Parse a model reply as JSON, keeping the raw text on failure.
pub fn parse_reply(raw: &str) -> Result<Value, BillSplitError> {
    let cleaned = postprocess::clean_reply(raw);
    serde_json::from_str(&cleaned).map_err(|e| BillSplitError::ParseFailure {
        detail: e.to_string(),
        raw: raw.to_string(),
    })
}
