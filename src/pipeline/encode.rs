//! Image encoding: composited `RgbaImage` → JPEG or PNG bytes.
//!
//! JPEG is the default export format because watermarked photos are what
//! social networks expect, and browsers export canvases the same way. JPEG
//! has no alpha channel, so the canvas is flattened to RGB first; the base
//! image is drawn fully opaque, so nothing visible is lost.

use crate::config::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a composited canvas in the requested format.
///
/// `jpeg_quality` (1–100) is ignored for PNG.
pub fn encode_image(
    img: &RgbaImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
            DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }

    debug!("Encoded {}x{} image → {} bytes {:?}", img.width(), img.height(), buf.len(), format);
    Ok(buf)
}
