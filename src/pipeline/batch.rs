//! Batch watermark runner: composite one logo onto a sequence of images.
//!
//! The logo is decoded once per batch; each base image is decoded, composited
//! and encoded in its own loop iteration so its buffers are released before
//! the next image starts. A failure on one image is recorded and the batch
//! moves on. Processing is sequential, which makes output order identical to
//! input order.

use crate::config::WatermarkConfig;
use crate::error::{ImageError, PostkitError};
use crate::output::{BatchOutput, BatchStats, WatermarkedImage};
use crate::pipeline::composite::{composite, decode};
use crate::pipeline::encode::encode_image;
use crate::pipeline::input::ImageAsset;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run a batch on a blocking worker thread.
///
/// Decoding and compositing are CPU-bound; running them inside
/// `spawn_blocking` keeps the async runtime responsive.
pub async fn run_batch(
    images: Vec<ImageAsset>,
    logo: Option<ImageAsset>,
    config: WatermarkConfig,
) -> Result<BatchOutput, PostkitError> {
    tokio::task::spawn_blocking(move || run_batch_blocking(&images, logo.as_ref(), &config))
        .await
        .map_err(|e| PostkitError::Internal(format!("Watermark task panicked: {}", e)))?
}

/// Blocking implementation of the batch runner.
///
/// * More than `config.max_images` images → the excess is dropped.
/// * No logo or no images → empty output, not an error.
/// * Undecodable logo → [`PostkitError::LogoDecodeFailed`].
/// * Undecodable image → recorded in [`BatchOutput::failures`].
pub fn run_batch_blocking(
    images: &[ImageAsset],
    logo: Option<&ImageAsset>,
    config: &WatermarkConfig,
) -> Result<BatchOutput, PostkitError> {
    let start = Instant::now();
    let submitted = images.len();
    let max = config.max_images.clamp(1, crate::config::MAX_IMAGES);
    let selected = &images[..submitted.min(max)];
    let truncated = submitted - selected.len();

    if truncated > 0 {
        warn!(
            "Batch has {} images; only the first {} are processed",
            submitted, max
        );
    }

    let Some(logo) = logo else {
        debug!("No logo supplied; nothing to watermark");
        return Ok(empty_output(submitted, truncated));
    };
    if selected.is_empty() {
        debug!("No images supplied; nothing to watermark");
        return Ok(empty_output(submitted, truncated));
    }

    let total = selected.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let logo_img = decode(&logo.bytes).map_err(|e| PostkitError::LogoDecodeFailed {
        name: logo.name.clone(),
        detail: e.to_string(),
    })?;
    debug!("Decoded logo '{}': {}x{}", logo.name, logo_img.width(), logo_img.height());

    let mut out = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, asset) in selected.iter().enumerate() {
        let image_num = index + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_image_start(image_num, total);
        }

        match watermark_one(index, asset, &logo_img, config) {
            Ok(img) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_complete(image_num, total, img.bytes.len());
                }
                out.push(img);
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_error(image_num, total, &e.to_string());
                }
                failures.push(e);
            }
        }
    }

    let stats = BatchStats {
        submitted,
        truncated,
        processed: out.len(),
        failed: failures.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Watermarked {}/{} images in {}ms",
        stats.processed, total, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.processed);
    }

    Ok(BatchOutput {
        images: out,
        failures,
        stats,
    })
}

/// Decode, composite and encode a single image.
fn watermark_one(
    index: usize,
    asset: &ImageAsset,
    logo: &DynamicImage,
    config: &WatermarkConfig,
) -> Result<WatermarkedImage, ImageError> {
    let base = decode(&asset.bytes).map_err(|e| ImageError::DecodeFailed {
        index,
        name: asset.name.clone(),
        detail: e.to_string(),
    })?;

    let canvas = composite(&base, logo, &config.placement);
    drop(base);

    let (width, height) = canvas.dimensions();
    let bytes = encode_image(&canvas, config.output_format, config.jpeg_quality).map_err(|e| {
        ImageError::EncodeFailed {
            index,
            name: asset.name.clone(),
            detail: e.to_string(),
        }
    })?;

    Ok(WatermarkedImage {
        source_index: index,
        source_name: asset.name.clone(),
        width,
        height,
        format: config.output_format,
        bytes,
    })
}

fn empty_output(submitted: usize, truncated: usize) -> BatchOutput {
    BatchOutput {
        stats: BatchStats {
            submitted,
            truncated,
            ..BatchStats::default()
        },
        ..BatchOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogoPlacement, LogoPosition, OutputFormat};
    use crate::progress::BatchProgressCallback;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn png(w: u32, h: u32, c: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba(c));
        encode_image(&img, OutputFormat::Png, 100).unwrap()
    }

    fn asset(name: &str, bytes: Vec<u8>) -> ImageAsset {
        ImageAsset::new(name, bytes)
    }

    fn config() -> WatermarkConfig {
        WatermarkConfig::builder()
            .placement(LogoPlacement::new(LogoPosition::BottomRight, 20.0, 100.0))
            .output_format(OutputFormat::Png)
            .build()
            .unwrap()
    }

    #[test]
    fn no_logo_is_empty_output() {
        let images = vec![asset("a.png", png(8, 8, [0, 0, 0, 255]))];
        let out = run_batch_blocking(&images, None, &config()).unwrap();
        assert!(out.is_empty());
        assert!(out.failures.is_empty());
    }

    #[test]
    fn no_images_is_empty_output() {
        let logo = asset("logo.png", png(4, 4, [255, 0, 0, 255]));
        let out = run_batch_blocking(&[], Some(&logo), &config()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn empty_batch_does_not_decode_logo() {
        let logo = asset("logo.png", b"not an image".to_vec());
        let out = run_batch_blocking(&[], Some(&logo), &config()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn bad_logo_aborts_batch() {
        let images = vec![asset("a.png", png(8, 8, [0, 0, 0, 255]))];
        let logo = asset("logo.svg", b"<svg/>".to_vec());
        let err = run_batch_blocking(&images, Some(&logo), &config()).unwrap_err();
        assert!(matches!(err, PostkitError::LogoDecodeFailed { .. }), "got {err:?}");
    }

    #[test]
    fn bad_image_is_isolated_and_order_kept() {
        let images = vec![
            asset("0.png", png(10, 10, [0, 0, 0, 255])),
            asset("1.png", b"garbage".to_vec()),
            asset("2.png", png(12, 6, [0, 0, 0, 255])),
        ];
        let logo = asset("logo.png", png(4, 4, [255, 0, 0, 255]));
        let out = run_batch_blocking(&images, Some(&logo), &config()).unwrap();

        let indices: Vec<_> = out.images.iter().map(|i| i.source_index).collect();
        assert_eq!(indices, [0, 2]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].index(), 1);
        assert_eq!((out.images[1].width, out.images[1].height), (12, 6));
        assert_eq!(out.stats.processed, 2);
        assert_eq!(out.stats.failed, 1);
    }

    #[test]
    fn sixty_images_truncate_to_fifty_in_order() {
        let bytes = png(6, 6, [10, 20, 30, 255]);
        let images: Vec<_> = (0..60)
            .map(|i| asset(&format!("{i}.png"), bytes.clone()))
            .collect();
        let logo = asset("logo.png", png(2, 2, [255, 255, 255, 255]));

        let out = run_batch_blocking(&images, Some(&logo), &config()).unwrap();
        assert_eq!(out.len(), 50);
        assert_eq!(out.stats.submitted, 60);
        assert_eq!(out.stats.truncated, 10);
        for (pos, img) in out.images.iter().enumerate() {
            assert_eq!(img.source_index, pos);
            assert_eq!(img.source_name, format!("{pos}.png"));
        }
    }

    #[test]
    fn progress_events_follow_batch() {
        #[derive(Default)]
        struct Counter {
            started: AtomicUsize,
            done: AtomicUsize,
            errors: AtomicUsize,
            success: AtomicUsize,
        }
        impl BatchProgressCallback for Counter {
            fn on_batch_start(&self, total: usize) {
                self.started.store(total, Ordering::SeqCst);
            }
            fn on_image_complete(&self, _n: usize, _t: usize, _len: usize) {
                self.done.fetch_add(1, Ordering::SeqCst);
            }
            fn on_image_error(&self, _n: usize, _t: usize, _e: &str) {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            fn on_batch_complete(&self, _t: usize, success: usize) {
                self.success.store(success, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter::default());
        let cfg = WatermarkConfig::builder()
            .output_format(OutputFormat::Png)
            .progress_callback(counter.clone() as Arc<dyn BatchProgressCallback>)
            .build()
            .unwrap();
        let images = vec![
            asset("ok.png", png(8, 8, [0, 0, 0, 255])),
            asset("bad.png", vec![0xff, 0xd8]),
        ];
        let logo = asset("logo.png", png(2, 2, [255, 255, 255, 255]));
        run_batch_blocking(&images, Some(&logo), &cfg).unwrap();

        assert_eq!(counter.started.load(Ordering::SeqCst), 2);
        assert_eq!(counter.done.load(Ordering::SeqCst), 1);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
        assert_eq!(counter.success.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_runner_matches_blocking() {
        let images = vec![asset("a.png", png(20, 10, [0, 0, 255, 255]))];
        let logo = asset("logo.png", png(4, 2, [255, 0, 0, 255]));
        let out = run_batch(images, Some(logo), config()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!((out.images[0].width, out.images[0].height), (20, 10));
    }
}
