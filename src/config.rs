//! Configuration types for watermarking, caption generation and the caption backend.
//!
//! Watermark behaviour is controlled through [`WatermarkConfig`], caption
//! generation through [`CaptionConfig`], and the HTTP backend through
//! [`ServerConfig`]. The first two are built via builders that clamp every
//! numeric knob into its legal range, so downstream code never re-validates.

use crate::error::PostkitError;
use crate::progress::BatchProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hard upper bound on the number of images in one batch.
pub const MAX_IMAGES: usize = 50;

/// Logo scale bounds, in percent of the base image width.
pub const MIN_SCALE_PERCENT: f64 = 5.0;
pub const MAX_SCALE_PERCENT: f64 = 50.0;

/// Logo opacity bounds, in percent.
pub const MIN_OPACITY_PERCENT: f64 = 10.0;
pub const MAX_OPACITY_PERCENT: f64 = 100.0;

// ── Watermark placement ──────────────────────────────────────────────────

/// Where the logo is anchored on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl LogoPosition {
    /// Parse a position name, falling back to [`LogoPosition::BottomRight`]
    /// for anything unrecognised.
    ///
    /// Accepts `top-left`, `top_left`, `topleft` and friends, case-insensitively.
    pub fn parse_lossy(s: &str) -> Self {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "topleft" => LogoPosition::TopLeft,
            "topright" => LogoPosition::TopRight,
            "bottomleft" => LogoPosition::BottomLeft,
            "center" | "centre" => LogoPosition::Center,
            _ => LogoPosition::BottomRight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoPosition::TopLeft => "top-left",
            LogoPosition::TopRight => "top-right",
            LogoPosition::BottomLeft => "bottom-left",
            LogoPosition::BottomRight => "bottom-right",
            LogoPosition::Center => "center",
        }
    }
}

impl fmt::Display for LogoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a logo is placed on every image of a batch.
///
/// Scale and opacity are clamped on construction and again by
/// [`LogoPlacement::clamped`] before use, so a placement deserialised from an
/// untrusted source can never push the compositor out of range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogoPlacement {
    pub position: LogoPosition,
    /// Logo width as a percentage of the base image width. Range: 5–50.
    pub scale_percent: f64,
    /// Uniform blend factor for the logo, in percent. Range: 10–100.
    pub opacity_percent: f64,
}

impl Default for LogoPlacement {
    fn default() -> Self {
        Self {
            position: LogoPosition::TopRight,
            scale_percent: 15.0,
            opacity_percent: 90.0,
        }
    }
}

impl LogoPlacement {
    pub fn new(position: LogoPosition, scale_percent: f64, opacity_percent: f64) -> Self {
        Self {
            position,
            scale_percent,
            opacity_percent,
        }
        .clamped()
    }

    /// Return a copy with scale and opacity forced into their legal ranges.
    ///
    /// NaN falls back to the default value of the field.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let clamp = |v: f64, lo: f64, hi: f64, fallback: f64| {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(lo, hi)
            }
        };
        Self {
            position: self.position,
            scale_percent: clamp(
                self.scale_percent,
                MIN_SCALE_PERCENT,
                MAX_SCALE_PERCENT,
                defaults.scale_percent,
            ),
            opacity_percent: clamp(
                self.opacity_percent,
                MIN_OPACITY_PERCENT,
                MAX_OPACITY_PERCENT,
                defaults.opacity_percent,
            ),
        }
    }

    /// Blend factor in `[0.1, 1.0]`.
    pub fn alpha(&self) -> f32 {
        (self.clamped().opacity_percent / 100.0) as f32
    }
}

/// Encoding of the watermarked output images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy JPEG (default, matches what browsers export for photos).
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

// ── Watermark configuration ──────────────────────────────────────────────

/// Configuration for a watermark batch.
///
/// # Example
/// ```rust
/// use social_postkit::{LogoPlacement, LogoPosition, WatermarkConfig};
///
/// let config = WatermarkConfig::builder()
///     .placement(LogoPlacement::new(LogoPosition::Center, 20.0, 75.0))
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.placement.scale_percent, 20.0);
/// ```
#[derive(Clone)]
pub struct WatermarkConfig {
    /// Logo position, scale and opacity. Default: top-right, 15 %, 90 %.
    pub placement: LogoPlacement,

    /// Output encoding. Default: JPEG.
    pub output_format: OutputFormat,

    /// JPEG quality, 1–100. Default: 92. Ignored for PNG.
    pub jpeg_quality: u8,

    /// Maximum number of images processed per batch. Range: 1–50. Default: 50.
    ///
    /// Images beyond this are dropped silently (logged at WARN).
    pub max_images: usize,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional per-image progress events.
    pub progress_callback: Option<Arc<dyn BatchProgressCallback>>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            placement: LogoPlacement::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 92,
            max_images: MAX_IMAGES,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for WatermarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkConfig")
            .field("placement", &self.placement)
            .field("output_format", &self.output_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_images", &self.max_images)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl WatermarkConfig {
    pub fn builder() -> WatermarkConfigBuilder {
        WatermarkConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WatermarkConfig`].
#[derive(Debug)]
pub struct WatermarkConfigBuilder {
    config: WatermarkConfig,
}

impl WatermarkConfigBuilder {
    pub fn placement(mut self, placement: LogoPlacement) -> Self {
        self.config.placement = placement.clamped();
        self
    }

    pub fn position(mut self, position: LogoPosition) -> Self {
        self.config.placement.position = position;
        self
    }

    pub fn scale_percent(mut self, scale: f64) -> Self {
        self.config.placement.scale_percent = scale;
        self.config.placement = self.config.placement.clamped();
        self
    }

    pub fn opacity_percent(mut self, opacity: f64) -> Self {
        self.config.placement.opacity_percent = opacity;
        self.config.placement = self.config.placement.clamped();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n.clamp(1, MAX_IMAGES);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn BatchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WatermarkConfig, PostkitError> {
        let c = &self.config;
        if c.max_images == 0 || c.max_images > MAX_IMAGES {
            return Err(PostkitError::InvalidConfig(format!(
                "max_images must be 1–{MAX_IMAGES}, got {}",
                c.max_images
            )));
        }
        if c.download_timeout_secs == 0 {
            return Err(PostkitError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Caption enums ────────────────────────────────────────────────────────

/// Copywriting structure the caption generator is asked to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopywritingFramework {
    /// Let the model pick the most persuasive structure. (default)
    #[default]
    Auto,
    /// Attention, Interest, Desire, Action.
    Aida,
    /// Problem, Agitate, Solution.
    Pas,
    /// A short narrative.
    Storytelling,
}

impl CopywritingFramework {
    /// Wire value used by the caption backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            CopywritingFramework::Auto => "auto",
            CopywritingFramework::Aida => "aida",
            CopywritingFramework::Pas => "pas",
            CopywritingFramework::Storytelling => "storytelling",
        }
    }

    /// Parse a wire value; unknown values become [`CopywritingFramework::Auto`].
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "aida" => CopywritingFramework::Aida,
            "pas" => CopywritingFramework::Pas,
            "storytelling" | "story" => CopywritingFramework::Storytelling,
            _ => CopywritingFramework::Auto,
        }
    }
}

impl fmt::Display for CopywritingFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which caption implementation [`crate::caption::build_generator`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionProvider {
    /// HTTP call to a caption backend that holds the upstream credential. (default)
    #[default]
    Proxy,
    /// In-process call to an LLM provider with a locally configured API key.
    Direct,
}

// ── Caption configuration ────────────────────────────────────────────────

/// Configuration for caption generation.
#[derive(Debug, Clone)]
pub struct CaptionConfig {
    /// Which implementation to use. Default: [`CaptionProvider::Proxy`].
    pub provider: CaptionProvider,

    /// Caption backend endpoint used by the proxy client.
    /// Default: `http://127.0.0.1:8787/api/generate-caption`.
    pub endpoint: String,

    /// Model sent to the backend when the request names none. Default: `gpt-4o`.
    pub proxy_model: String,

    /// `edgequake-llm` provider name for the direct path. Default: `gemini`.
    pub direct_provider: String,

    /// Model for the direct path. The provider is built with it once; a model
    /// named in a request is ignored. Default: `gemini-2.5-flash`.
    pub direct_model: String,

    /// Environment variable that must hold the direct provider's API key.
    /// Default: `GEMINI_API_KEY`.
    pub direct_api_key_env: String,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum caption tokens. Default: 256.
    pub max_tokens: usize,

    /// Per-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Custom system prompt. If None, built from the framework.
    pub system_prompt: Option<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: CaptionProvider::default(),
            endpoint: "http://127.0.0.1:8787/api/generate-caption".to_string(),
            proxy_model: "gpt-4o".to_string(),
            direct_provider: "gemini".to_string(),
            direct_model: "gemini-2.5-flash".to_string(),
            direct_api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            request_timeout_secs: 60,
            system_prompt: None,
        }
    }
}

impl CaptionConfig {
    pub fn builder() -> CaptionConfigBuilder {
        CaptionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CaptionConfig`].
#[derive(Debug)]
pub struct CaptionConfigBuilder {
    config: CaptionConfig,
}

impl CaptionConfigBuilder {
    pub fn provider(mut self, provider: CaptionProvider) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn proxy_model(mut self, model: impl Into<String>) -> Self {
        self.config.proxy_model = model.into();
        self
    }

    pub fn direct_provider(mut self, name: impl Into<String>) -> Self {
        self.config.direct_provider = name.into();
        self
    }

    pub fn direct_model(mut self, model: impl Into<String>) -> Self {
        self.config.direct_model = model.into();
        self
    }

    pub fn direct_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.direct_api_key_env = var.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CaptionConfig, PostkitError> {
        let c = &self.config;
        if c.provider == CaptionProvider::Proxy && !crate::pipeline::input::is_url(&c.endpoint) {
            return Err(PostkitError::InvalidConfig(format!(
                "Caption endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.max_tokens == 0 {
            return Err(PostkitError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 {
            return Err(PostkitError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Backend configuration ────────────────────────────────────────────────

/// Configuration for the HTTP caption backend.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: `127.0.0.1:8787`.
    pub listen_addr: String,

    /// Base URL of the OpenAI-compatible upstream. Default: `https://api.openai.com`.
    pub upstream_base_url: String,

    /// Upstream credential. `None` makes every request answer "not configured".
    pub api_key: Option<String>,

    /// Upstream call timeout in seconds. Default: 60.
    pub upstream_timeout_secs: u64,

    /// Sampling temperature forwarded upstream. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens forwarded upstream. Default: 256.
    pub max_tokens: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            upstream_base_url: "https://api.openai.com".to_string(),
            api_key: None,
            upstream_timeout_secs: 60,
            temperature: 0.7,
            max_tokens: 256,
        }
    }
}

impl ServerConfig {
    /// Default configuration with the credential taken from `OPENAI_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
