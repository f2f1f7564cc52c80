//! Watermark entry points: run a batch, export it, and keep the latest result.
//!
//! [`watermark_files`] is the one-shot path used by the CLI: load inputs,
//! composite, return. [`WatermarkController`] is for long-lived callers that
//! re-run the batch whenever images, logo or placement change and must never
//! show a result computed from outdated inputs.

use crate::config::WatermarkConfig;
use crate::error::PostkitError;
use crate::output::{BatchOutput, WatermarkedImage};
use crate::pipeline::input::{load_asset, load_assets, ImageAsset};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub use crate::pipeline::batch::{run_batch, run_batch_blocking};

/// Files written concurrently by [`export_images`].
const EXPORT_CONCURRENCY: usize = 8;

/// Load images and an optional logo from paths or URLs and watermark them.
///
/// Only the first `config.max_images` inputs are loaded; the rest are
/// counted in [`crate::output::BatchStats::truncated`].
pub async fn watermark_files(
    inputs: &[String],
    logo: Option<&str>,
    config: &WatermarkConfig,
) -> Result<BatchOutput, PostkitError> {
    let keep = inputs.len().min(config.max_images);
    info!("Watermarking {} of {} images", keep, inputs.len());

    let images = load_assets(&inputs[..keep], config.download_timeout_secs).await?;
    let logo = match logo {
        Some(l) => Some(load_asset(l, config.download_timeout_secs).await?),
        None => None,
    };

    let mut output = run_batch(images, logo, config.clone()).await?;
    output.stats.submitted = inputs.len();
    output.stats.truncated = inputs.len() - keep;
    Ok(output)
}

/// Synchronous wrapper around [`watermark_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn watermark_files_sync(
    inputs: &[String],
    logo: Option<&str>,
    config: &WatermarkConfig,
) -> Result<BatchOutput, PostkitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PostkitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(watermark_files(inputs, logo, config))
}

/// Write images to `dir` as `watermarked_image_<n>.<ext>`.
///
/// `n` is the 1-based position in `images`, not the source position: after a
/// failed image the numbering closes the gap. Each file is written to a
/// temporary name and renamed into place. Returns the paths in input order.
pub async fn export_images(images: &[WatermarkedImage], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PostkitError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PostkitError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written: Vec<(usize, PathBuf)> = stream::iter(images.iter().enumerate())
        .map(|(pos, img)| {
            let path = dir.join(img.export_name(pos));
            async move { write_atomic(&path, &img.bytes).await.map(|_| (pos, path)) }
        })
        .buffer_unordered(EXPORT_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    written.sort_by_key(|(pos, _)| *pos);
    info!("Exported {} images to {}", written.len(), dir.display());
    Ok(written.into_iter().map(|(_, p)| p).collect())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PostkitError> {
    let err = |e| PostkitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await.map_err(err)?;
    tokio::fs::rename(&tmp, path).await.map_err(err)?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Everything one batch run depends on.
#[derive(Debug, Clone, Default)]
pub struct WatermarkInputs {
    pub images: Vec<ImageAsset>,
    pub logo: Option<ImageAsset>,
    pub config: WatermarkConfig,
}

/// Re-runs the batch on every input change and keeps only the newest result.
///
/// Each run takes a generation number from [`begin`](Self::begin). A result
/// is stored by [`commit`](Self::commit) only if no newer run has started
/// since, so a slow, superseded batch can never overwrite or mix with the
/// output of a newer one.
#[derive(Debug, Default)]
pub struct WatermarkController {
    generation: AtomicU64,
    current: Mutex<Option<Arc<BatchOutput>>>,
}

impl WatermarkController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every run in flight.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation handed out by [`begin`](Self::begin).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store `output` as the current result if `generation` is still the newest.
    ///
    /// `None` clears the current result. Returns `false` for a stale generation.
    pub fn commit(&self, generation: u64, output: Option<BatchOutput>) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(
                "Discarding stale batch generation {} (current {})",
                generation,
                self.generation()
            );
            return false;
        }
        *current = output.map(Arc::new);
        true
    }

    /// Latest committed result.
    pub fn current(&self) -> Option<Arc<BatchOutput>> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Recompute the whole batch from `inputs`.
    ///
    /// Returns `Ok(None)` when a newer refresh started before this one
    /// finished; its result is dropped. A fatal error on the newest
    /// generation clears the current result.
    pub async fn refresh(&self, inputs: WatermarkInputs) -> Result<Option<Arc<BatchOutput>>, PostkitError> {
        let generation = self.begin();
        match run_batch(inputs.images, inputs.logo, inputs.config).await {
            Ok(output) => {
                if self.commit(generation, Some(output)) {
                    Ok(self.current())
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                self.commit(generation, None);
                Err(e)
            }
        }
    }
}
