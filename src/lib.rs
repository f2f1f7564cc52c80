//! # social-postkit
//!
//! Watermark photos with a logo and write social-media captions with LLMs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images + logo
//!  │
//!  ├─ 1. Input      load local files or download URLs
//!  ├─ 2. Composite  scale, place and alpha-blend the logo (spawn_blocking)
//!  ├─ 3. Encode     JPEG (default) or PNG
//!  └─ 4. Export     watermarked_image_<n>.<ext>
//!
//! topic + framework + destinations
//!  │
//!  ├─ 1. Store      remember http(s) destinations and their contact text
//!  ├─ 2. Caption    one call to the caption backend or an LLM provider
//!  ├─ 3. Polish     strip fences, quotes, stray Markdown
//!  └─ 4. Assemble   one post per destination, contact text appended
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use social_postkit::{watermark_files, export_images, WatermarkConfig, LogoPosition};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatermarkConfig::builder()
//!         .position(LogoPosition::BottomRight)
//!         .scale_percent(20.0)
//!         .build()?;
//!     let inputs = vec!["beach.jpg".to_string(), "sunset.jpg".to_string()];
//!     let output = watermark_files(&inputs, Some("logo.png"), &config).await?;
//!     export_images(&output.images, "out").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `postkit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`], the HTTP caption backend (axum) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod caption;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod posts;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod watermark;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use caption::{
    build_generator, CaptionGenerator, CaptionRequest, DirectCaptionClient, ProxyCaptionClient,
};
pub use config::{
    CaptionConfig, CaptionConfigBuilder, CaptionProvider, CopywritingFramework, LogoPlacement,
    LogoPosition, OutputFormat, ServerConfig, WatermarkConfig, WatermarkConfigBuilder, MAX_IMAGES,
};
pub use error::{CaptionError, CaptionFailed, ImageError, PostkitError, StoreError};
pub use output::{BatchOutput, BatchStats, GeneratedPost, WatermarkedImage};
pub use pipeline::composite::{composite, logo_rect, LogoRect};
pub use pipeline::input::ImageAsset;
pub use posts::{assemble, destination_label, fill_contacts_from_store, generate_posts, Destination};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{DestinationStore, JsonFileBackend, MemoryBackend, StoreBackend};
pub use watermark::{
    export_images, run_batch, run_batch_blocking, watermark_files, watermark_files_sync,
    WatermarkController, WatermarkInputs,
};
