//! Progress-callback trait for per-image watermark events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::WatermarkConfigBuilder::progress_callback`] to receive
//! events as the batch runner processes each image.
//!
//! Callers can forward events to a channel, a terminal progress bar or a log
//! without the library knowing how the host application communicates. The
//! batch runs on a blocking worker thread, so the trait is `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use social_postkit::{BatchProgressCallback, WatermarkConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, image_num: usize, total: usize, encoded_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Image {}/{} done ({} bytes)", image_num, total, encoded_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = WatermarkConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Image numbers are 1-indexed.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after truncation, before the logo is decoded.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before an image is decoded.
    fn on_image_start(&self, image_num: usize, total_images: usize) {
        let _ = (image_num, total_images);
    }

    /// Called when an image was composited and encoded.
    ///
    /// `encoded_len` is the byte size of the encoded output.
    fn on_image_complete(&self, image_num: usize, total_images: usize, encoded_len: usize) {
        let _ = (image_num, total_images, encoded_len);
    }

    /// Called when an image failed to decode or encode. The batch continues.
    fn on_image_error(&self, image_num: usize, total_images: usize, error: &str) {
        let _ = (image_num, total_images, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::WatermarkConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_images: usize) {
            self.started_total.store(total_images, Ordering::SeqCst);
        }

        fn on_image_start(&self, _image_num: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _image_num: usize, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _image_num: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_image_start(1, 5);
        cb.on_image_complete(1, 5, 42);
        cb.on_image_error(2, 5, "some error");
        cb.on_batch_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_image_start(1, 3);
        tracker.on_image_complete(1, 3, 100);
        tracker.on_image_start(2, 3);
        tracker.on_image_complete(2, 3, 200);
        tracker.on_image_start(3, 3);
        tracker.on_image_error(3, 3, "decode failed");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_image_start(1, 10);
        cb.on_image_complete(1, 10, 512);
    }
}
