//! Pipeline stages for watermarking images and cleaning captions.
//!
//! Each submodule implements exactly one step, so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ composite ──▶ encode ──▶ (export)
//! (URL/path)  (logo blend)  (JPEG/PNG)
//!        └──────── batch ────────┘
//! ```
//!
//! 1. [`input`]     — load a user-supplied path or URL into memory
//! 2. [`composite`] — geometry and alpha blending of the logo onto one image
//! 3. [`encode`]    — encode the composited canvas
//! 4. [`batch`]     — drive 2 and 3 over up to 50 images; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 5. [`postprocess`] — deterministic clean-up of generated captions

pub mod batch;
pub mod composite;
pub mod encode;
pub mod input;
pub mod postprocess;
