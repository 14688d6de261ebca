//! Pipeline stages for turning a receipt photo into bill JSON.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the model backend can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ encode ──▶ llm ──▶ postprocess
//! (HEIC→JPEG)   (base64)   (VLM)   (cleanup)
//! ```
//!
//! 1. [`normalize`]: convert HEIC/HEIF uploads to JPEG; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 2. [`encode`]: base64-wrap the bytes for the request body
//! 3. [`llm`]: the only stage with network I/O
//! 4. [`postprocess`]: strip code fences and invisible characters from the
//!    reply before JSON parsing

pub mod encode;
pub mod llm;
pub mod normalize;
pub mod postprocess;
