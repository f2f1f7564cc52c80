//! Error types for the social-postkit library.
//!
//! Four error types reflect four distinct failure modes:
//!
//! * [`PostkitError`] — **Fatal**: the operation cannot proceed at all
//!   (input file missing, logo undecodable, invalid configuration). Returned
//!   as `Err(PostkitError)` from the top-level watermark functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image failed to decode or
//!   encode but every other image in the batch is fine. Stored inside
//!   [`crate::output::BatchOutput::failures`] so one bad upload never blocks
//!   the rest of the batch.
//!
//! * [`CaptionError`] — caption generation failed. Never escapes a
//!   [`crate::caption::CaptionGenerator`]: it is rendered into an
//!   `"Error: …"` string that callers display as-is.
//!
//! * [`StoreError`] — the destination store could not be read or written.
//!   Logged and ignored by [`crate::store::DestinationStore`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the social-postkit library.
///
/// Per-image failures use [`ImageError`] and are stored in
/// [`crate::output::BatchOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PostkitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Compositing errors ────────────────────────────────────────────────
    /// The logo could not be decoded; the whole batch is aborted.
    #[error("Logo '{name}' is not a decodable raster image: {detail}")]
    LogoDecodeFailed { name: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an exported image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image of a batch.
///
/// `index` is the 0-based position of the image in the submitted sequence.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The uploaded asset is not a decodable raster image.
    #[error("Image {index} ('{name}'): decode failed: {detail}")]
    DecodeFailed {
        index: usize,
        name: String,
        detail: String,
    },

    /// The composited image could not be encoded to the output format.
    #[error("Image {index} ('{name}'): encode failed: {detail}")]
    EncodeFailed {
        index: usize,
        name: String,
        detail: String,
    },
}

impl ImageError {
    /// 0-based position of the failed image in the submitted sequence.
    pub fn index(&self) -> usize {
        match self {
            ImageError::DecodeFailed { index, .. } | ImageError::EncodeFailed { index, .. } => {
                *index
            }
        }
    }
}

/// Why a caption could not be generated.
#[derive(Debug, Clone, Error)]
pub enum CaptionError {
    /// Required request parameters were missing; no external call was made.
    #[error("Missing required parameters: {0}")]
    Validation(String),

    /// No credential is configured for the direct provider.
    #[error("AI caption generation is disabled. Please configure the API Key.")]
    NotConfigured,

    /// Network / transport failure or an unreadable response body.
    #[error("{0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },
}

impl CaptionError {
    /// Render the error as the terminal string shown to the user.
    ///
    /// Starts with `"Error:"`, except [`CaptionError::NotConfigured`] which is
    /// shown as its bare notice.
    pub fn user_message(&self) -> String {
        match self {
            CaptionError::NotConfigured => self.to_string(),
            CaptionError::Validation(_) => format!("Error: {self}"),
            _ => format!("Error: Could not generate a caption. Details: {self}"),
        }
    }
}

/// A caption generator returned a diagnostic instead of a caption.
///
/// Holds the diagnostic string exactly as the generator produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CaptionFailed(pub String);

/// Failure reading or writing the persisted destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Destination store I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination store is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}
