//! Image normalisation: HEIC/HEIF uploads → JPEG.
//!
//! iPhones save photos as HEIC by default, and vision APIs only accept
//! JPEG, PNG, GIF and WebP. HEIC/HEIF uploads are decoded, flattened to RGB
//! and re-encoded as JPEG; every other upload passes through byte-identical.
//!
//! ## Why spawn_blocking?
//!
//! HEIC decoding goes through libheif (C++) and JPEG encoding is CPU-bound;
//! a 12 MP photo takes long enough to stall a Tokio worker. [`normalize`]
//! moves the work onto the blocking pool.
//!
//! HEIC decoding needs the `heic` cargo feature (and libheif on the build
//! host). Without it, HEIC uploads fail with [`BillSplitError::BadImage`].

use crate::error::BillSplitError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info};

/// MIME types that mark an upload as HEIC/HEIF.
const HEIF_MEDIA_TYPES: &[&str] = &[
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];

/// An image ready to hand to the vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// True when the bytes were re-encoded rather than passed through.
    pub converted: bool,
}

/// Whether the declared content type or the file name marks a HEIC/HEIF image.
pub fn is_heif(content_type: &str, filename: Option<&str>) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    if HEIF_MEDIA_TYPES.contains(&content_type.as_str()) {
        return true;
    }
    filename
        .map(|name| {
            let name = name.to_ascii_lowercase();
            name.ends_with(".heic") || name.ends_with(".heif")
        })
        .unwrap_or(false)
}

/// Normalise an upload on the blocking thread pool.
pub async fn normalize(
    bytes: Vec<u8>,
    content_type: String,
    filename: Option<String>,
    jpeg_quality: u8,
) -> Result<NormalizedImage, BillSplitError> {
    tokio::task::spawn_blocking(move || {
        normalize_blocking(bytes, &content_type, filename.as_deref(), jpeg_quality)
    })
    .await
    .map_err(|e| BillSplitError::Internal(format!("Image conversion task panicked: {}", e)))?
}

/// Blocking implementation of [`normalize`].
pub fn normalize_blocking(
    bytes: Vec<u8>,
    content_type: &str,
    filename: Option<&str>,
    jpeg_quality: u8,
) -> Result<NormalizedImage, BillSplitError> {
    if !is_heif(content_type, filename) {
        debug!("Passing {} upload through unchanged ({} bytes)", content_type, bytes.len());
        return Ok(NormalizedImage {
            bytes,
            media_type: content_type.to_string(),
            converted: false,
        });
    }

    let decoded = decode_heif(&bytes)?;
    let jpeg = encode_jpeg(&decoded, jpeg_quality)?;
    info!(
        "Converted HEIC {}x{} ({} bytes) → JPEG ({} bytes)",
        decoded.width(),
        decoded.height(),
        bytes.len(),
        jpeg.len()
    );

    Ok(NormalizedImage {
        bytes: jpeg,
        media_type: "image/jpeg".to_string(),
        converted: true,
    })
}

/// Flatten an image to 8-bit RGB and encode it as JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BillSplitError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| BillSplitError::BadImage(e.to_string()))?;
    Ok(buf)
}

#[cfg(feature = "heic")]
fn decode_heif(bytes: &[u8]) -> Result<DynamicImage, BillSplitError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let bad = |e: libheif_rs::HeifError| BillSplitError::BadImage(e.to_string());

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(bad)?;
    let handle = ctx.primary_image_handle().map_err(bad)?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(bad)?;

    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or_else(|| {
        BillSplitError::BadImage("decoder returned no interleaved RGB plane".into())
    })?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let row = row.get(..row_len).ok_or_else(|| {
            BillSplitError::BadImage("decoded row shorter than image width".into())
        })?;
        pixels.extend_from_slice(row);
    }

    image::RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BillSplitError::BadImage("decoded pixel buffer has the wrong size".into()))
}

#[cfg(not(feature = "heic"))]
fn decode_heif(_bytes: &[u8]) -> Result<DynamicImage, BillSplitError> {
    Err(BillSplitError::BadImage(
        "HEIC/HEIF support is not enabled in this build (enable the `heic` feature)".into(),
    ))
}
