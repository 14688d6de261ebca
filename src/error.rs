//! Error type for the billsplit library.
//!
//! Every operation either succeeds completely or fails with one
//! [`BillSplitError`]; there is no partial result anywhere. The variant
//! decides the HTTP status the server answers with:
//!
//! | Variant | Status |
//! |---------|--------|
//! | `InvalidInput`, `BadImage` | 400 |
//! | `PayloadTooLarge` | 413 |
//! | `UnsupportedMediaType` | 415 |
//! | `MalformedRequest` | 422 |
//! | `ParseFailure`, `UpstreamFailure`, `Internal`, `InvalidConfig` | 500 |

use thiserror::Error;

/// All errors returned by the billsplit library.
#[derive(Debug, Error)]
pub enum BillSplitError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// The request was well-formed but its content is unusable
    /// (non-image upload, zero people, item nobody pays for, …).
    #[error("{0}")]
    InvalidInput(String),

    /// The request body exceeds the configured upload limit.
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// A JSON endpoint was called without an `application/json` body.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The JSON body could not be decoded into the expected request shape.
    #[error("Invalid request body: {0}")]
    MalformedRequest(String),

    /// An uploaded HEIC/HEIF image could not be decoded or re-encoded.
    #[error("Error converting HEIC image: {0}")]
    BadImage(String),

    // ── Vision model errors ───────────────────────────────────────────────
    /// The model answered, but its reply is not valid JSON.
    ///
    /// `raw` holds the untouched reply text for diagnosis.
    #[error("Error parsing bill: {detail}\nModel reply: {raw}")]
    ParseFailure { detail: String, raw: String },

    /// The vision model could not be reached or rejected the request
    /// (missing API key, transport error, non-2xx status).
    #[error("Error parsing bill: {0}")]
    UpstreamFailure(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillSplitError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BillSplitError::InvalidInput(_) | BillSplitError::BadImage(_) => 400,
            BillSplitError::PayloadTooLarge(_) => 413,
            BillSplitError::UnsupportedMediaType(_) => 415,
            BillSplitError::MalformedRequest(_) => 422,
            BillSplitError::ParseFailure { .. }
            | BillSplitError::UpstreamFailure(_)
            | BillSplitError::InvalidConfig(_)
            | BillSplitError::Internal(_) => 500,
        }
    }

    /// True when the caller, not the service or the model, is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
