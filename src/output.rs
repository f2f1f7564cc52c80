//! Result types produced by the watermark batch and the post assembler.

use crate::config::OutputFormat;
use crate::error::ImageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// One encoded, watermarked image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkedImage {
    /// 0-based position of the source image in the submitted sequence.
    pub source_index: usize,
    /// Display name of the source asset (file name or URL).
    pub source_name: String,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Encoded image bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl WatermarkedImage {
    /// Export name for the image at 0-based output position `position`:
    /// `watermarked_image_<n>.<ext>` with `n` 1-based.
    pub fn export_name(&self, position: usize) -> String {
        format!("watermarked_image_{}.{}", position + 1, self.format.extension())
    }

    /// `data:<mime>;base64,…` URL of the encoded bytes.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Counters for a single batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Images handed to the runner before truncation.
    pub submitted: usize,
    /// Images dropped because the batch exceeded its maximum size.
    pub truncated: usize,
    /// Images composited and encoded successfully.
    pub processed: usize,
    /// Images that failed to decode or encode.
    pub failed: usize,
    pub duration_ms: u64,
}

/// Everything a batch run produced.
///
/// `images` keeps the order of the submitted sequence; failed images are
/// absent from it and listed in `failures` instead. A failure therefore
/// shifts every later image up one position, so a position in `images` only
/// equals the input position when nothing failed. Use
/// [`WatermarkedImage::source_index`] to map an output back to its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    pub images: Vec<WatermarkedImage>,
    pub failures: Vec<ImageError>,
    pub stats: BatchStats,
}

impl BatchOutput {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// A finished post for one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub destination_label: String,
    pub final_caption: String,
}
