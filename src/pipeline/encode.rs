//! Image encoding: page image → base64 PNG wrapped in `ImageData`.
//!
//! Gemini accepts inline images as base64 data in the JSON request body.
//! PNG is lossless; small print in financial tables survives where JPEG
//! artefacts would blur digits.

use crate::error::ReportError;
use crate::pipeline::input::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Encode a decoded image as a base64 PNG attachment.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(wrap_png(&buf))
}

/// Encode a page file for the extraction request.
///
/// Files that are already PNG are passed through byte for byte. Anything
/// else the `image` crate can decode is re-encoded as PNG.
pub fn encode_page(page: &PageImage) -> Result<ImageData, ReportError> {
    let unreadable = |detail: String| ReportError::UnreadableImage {
        path: page.path.clone(),
        detail,
    };

    let bytes = std::fs::read(&page.path).map_err(|e| unreadable(e.to_string()))?;

    if matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)) {
        debug!("{}: {} PNG bytes passed through", page.name, bytes.len());
        return Ok(wrap_png(&bytes));
    }

    let img = image::load_from_memory(&bytes).map_err(|e| unreadable(e.to_string()))?;
    debug!("{}: re-encoded {}x{} image as PNG", page.name, img.width(), img.height());
    encode_image(&img).map_err(|e| unreadable(e.to_string()))
}

fn wrap_png(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    ImageData::new(b64, "image/png").with_detail("high")
}
