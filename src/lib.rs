//! # billsplit
//!
//! Read a restaurant receipt with a vision model and split the bill.
//!
//! Two independent halves:
//!
//! * **Receipt parsing**: an uploaded photo (JPEG, PNG, or HEIC/HEIF straight
//!   off an iPhone) is normalised, sent to a multimodal model together with a
//!   fixed instruction, and the model's JSON reply is returned.
//! * **Splitting**: pure arithmetic over a client-supplied bill. Divide it
//!   evenly, or divide each item among the people who shared it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Check      reject non-image uploads
//!  ├─ 2. Normalize  HEIC/HEIF → JPEG (spawn_blocking)
//!  ├─ 3. Encode     bytes → base64 ImageData
//!  ├─ 4. VLM        one call through the VisionModel trait
//!  └─ 5. Parse      strip fences, parse JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use billsplit::{split_equal, BillItem, SplitRequest};
//!
//! let request = SplitRequest {
//!     items: vec![BillItem::new("Pizza", 20.0, 1)],
//!     tax: 2.0,
//!     tip: 3.0,
//!     people_count: 5,
//!     split_type: "equal".into(),
//! };
//! let split = split_equal(&request).unwrap();
//! assert_eq!(split.per_person, 5.0);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `billsplit` server binary (clap + anyhow + tracing-subscriber) |
//! | `heic`  | on      | Decodes HEIC/HEIF uploads via the system libheif (>= 1.18) |
//! | `heic-bundled` | off | Like `heic`, but builds libheif from source |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bill;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bill::{BillData, BillItem, EqualSplit, ItemSplit, ItemSplitRequest, SplitRequest};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::BillSplitError;
pub use extract::{extract_bill, parse_receipt, Upload};
pub use pipeline::encode::ImageData;
pub use pipeline::llm::{AnthropicVision, VisionModel};
pub use server::{build_router, serve, AppState};
pub use split::{split_by_item, split_equal};
