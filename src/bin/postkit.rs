//! CLI binary for social-postkit.
//!
//! A thin shim over the library crate that maps CLI flags onto
//! `WatermarkConfig` / `CaptionConfig` / `ServerConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use social_postkit::{
    build_generator, export_images, fill_contacts_from_store, generate_posts, watermark_files,
    BatchProgressCallback, CaptionConfig, CaptionProvider, CaptionRequest, CopywritingFramework,
    Destination, DestinationStore, LogoPlacement, LogoPosition, OutputFormat, ProgressCallback,
    WatermarkConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar with one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Watermarking");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, image_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&image_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Watermarking {total_images} images…"))
        ));
    }

    fn on_image_start(&self, image_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(image_num, Instant::now());
        self.bar.set_message(format!("image {image_num}"));
    }

    fn on_image_complete(&self, image_num: usize, total: usize, encoded_len: usize) {
        let secs = self.elapsed_secs(image_num);
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {:<12}  {}",
            green("✓"),
            image_num,
            total,
            dim(&format!("{:>6} KiB", encoded_len / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, image_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(image_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}  {}",
            red("✗"),
            image_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let failed = total_images.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} images watermarked",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images watermarked  ({} failed)",
                if failed == total_images { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Watermark photos with a logo in the bottom-right corner
  postkit watermark beach.jpg sunset.jpg --logo logo.png --position bottom-right -o out/

  # Bigger, fainter logo, PNG output
  postkit watermark *.jpg --logo logo.png --scale 30 --opacity 50 --format png

  # Caption via the local caption backend
  postkit serve &
  postkit caption "Summer sale on sunglasses" --framework aida \
      --page "https://facebook.com/acme|Call 555-1234"

  # Caption via Gemini directly
  GEMINI_API_KEY=... postkit caption "New coffee blend" --provider direct

  # List saved pages
  postkit pages

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY     Upstream key used by `postkit serve`
  GEMINI_API_KEY     Key for `--provider direct`
  POSTKIT_ENDPOINT   Caption backend URL for `--provider proxy`
  POSTKIT_STORE      Saved pages file (default .postkit/saved_pages.json)
  RUST_LOG           Override log filtering
"#;

/// Watermark images with a logo and generate social-media captions.
#[derive(Parser, Debug)]
#[command(
    name = "postkit",
    version,
    about = "Watermark images with a logo and generate social-media captions",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "POSTKIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "POSTKIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "POSTKIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "POSTKIT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a logo onto up to 50 images and write them to a directory.
    Watermark(WatermarkArgs),
    /// Generate a caption and one post per page.
    Caption(CaptionArgs),
    /// List saved pages and their contact text.
    Pages(StoreArgs),
    /// Run the HTTP caption backend.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct WatermarkArgs {
    /// Image paths or HTTP/HTTPS URLs. Only the first 50 are used.
    #[arg(required = true)]
    images: Vec<String>,

    /// Logo path or URL. Without a logo nothing is written.
    #[arg(short, long, env = "POSTKIT_LOGO")]
    logo: Option<String>,

    /// Logo position.
    #[arg(long, value_enum, default_value = "top-right")]
    position: PositionArg,

    /// Logo width in percent of the image width (5–50).
    #[arg(long, default_value_t = 15.0)]
    scale: f64,

    /// Logo opacity in percent (10–100).
    #[arg(long, default_value_t = 90.0)]
    opacity: f64,

    /// Output format.
    #[arg(long, value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// JPEG quality (1–100).
    #[arg(long, default_value_t = 92,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Directory for watermarked_image_<n>.<ext> files.
    #[arg(short, long, env = "POSTKIT_OUT_DIR", default_value = "out")]
    out_dir: PathBuf,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "POSTKIT_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct CaptionArgs {
    /// What the post is about.
    topic: String,

    /// Copywriting framework.
    #[arg(long, value_enum, default_value = "auto")]
    framework: FrameworkArg,

    /// Caption source: the caption backend (proxy) or an LLM provider (direct).
    #[arg(long, value_enum, env = "POSTKIT_PROVIDER", default_value = "proxy")]
    provider: ProviderArg,

    /// Model ID (proxy default gpt-4o, direct default gemini-2.5-flash).
    #[arg(long, env = "POSTKIT_MODEL")]
    model: Option<String>,

    /// Caption backend URL.
    #[arg(long, env = "POSTKIT_ENDPOINT",
          default_value = "http://127.0.0.1:8787/api/generate-caption")]
    endpoint: String,

    /// edgequake-llm provider name for --provider direct.
    #[arg(long, env = "POSTKIT_DIRECT_PROVIDER", default_value = "gemini")]
    direct_provider: String,

    /// Environment variable holding the direct provider's API key.
    #[arg(long, default_value = "GEMINI_API_KEY")]
    api_key_env: String,

    /// Path to a text file containing a custom system prompt (direct only).
    #[arg(long, env = "POSTKIT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Target page as `URL|contact text`; repeatable.
    #[arg(long = "page", value_name = "URL|CONTACT")]
    pages: Vec<String>,

    /// Do not remember pages in the saved-pages file.
    #[arg(long)]
    no_save: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "POSTKIT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Saved pages file.
    #[arg(long, env = "POSTKIT_STORE", default_value = ".postkit/saved_pages.json")]
    store: PathBuf,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "POSTKIT_LISTEN", default_value = "127.0.0.1:8787")]
    listen: String,

    /// Base URL of the OpenAI-compatible upstream.
    #[arg(long, env = "POSTKIT_UPSTREAM_URL", default_value = "https://api.openai.com")]
    upstream_url: String,

    /// Upstream call timeout in seconds.
    #[arg(long, env = "POSTKIT_UPSTREAM_TIMEOUT", default_value_t = 60)]
    upstream_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PositionArg {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl From<PositionArg> for LogoPosition {
    fn from(v: PositionArg) -> Self {
        match v {
            PositionArg::TopLeft => LogoPosition::TopLeft,
            PositionArg::TopRight => LogoPosition::TopRight,
            PositionArg::BottomLeft => LogoPosition::BottomLeft,
            PositionArg::BottomRight => LogoPosition::BottomRight,
            PositionArg::Center => LogoPosition::Center,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FrameworkArg {
    Auto,
    Aida,
    Pas,
    Storytelling,
}

impl From<FrameworkArg> for CopywritingFramework {
    fn from(v: FrameworkArg) -> Self {
        match v {
            FrameworkArg::Auto => CopywritingFramework::Auto,
            FrameworkArg::Aida => CopywritingFramework::Aida,
            FrameworkArg::Pas => CopywritingFramework::Pas,
            FrameworkArg::Storytelling => CopywritingFramework::Storytelling,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    Proxy,
    Direct,
}

impl From<ProviderArg> for CaptionProvider {
    fn from(v: ProviderArg) -> Self {
        match v {
            ProviderArg::Proxy => CaptionProvider::Proxy,
            ProviderArg::Direct => CaptionProvider::Direct,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while watermarking.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && matches!(cli.command, Command::Watermark(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Watermark(ref args) => run_watermark(&cli, args, show_progress).await,
        Command::Caption(ref args) => run_caption(&cli, args).await,
        Command::Pages(ref args) => run_pages(&cli, args),
        #[cfg(feature = "server")]
        Command::Serve(ref args) => run_serve(args).await,
    }
}

async fn run_watermark(cli: &Cli, args: &WatermarkArgs, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let mut builder = WatermarkConfig::builder()
        .placement(LogoPlacement::new(args.position.into(), args.scale, args.opacity))
        .output_format(args.format.into())
        .jpeg_quality(args.quality)
        .download_timeout_secs(args.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    if args.logo.is_none() && !cli.quiet {
        eprintln!("{} No --logo given; nothing to watermark", cyan("⚠"));
    }

    let output = watermark_files(&args.images, args.logo.as_deref(), &config)
        .await
        .context("Watermarking failed")?;

    let paths = export_images(&output.images, &args.out_dir)
        .await
        .context("Export failed")?;

    if cli.json {
        let json = serde_json::json!({
            "images": output.images,
            "failures": output.failures,
            "stats": output.stats,
            "files": paths,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if !cli.quiet {
        if output.stats.truncated > 0 {
            eprintln!(
                "{} {} images over the limit were skipped",
                cyan("⚠"),
                output.stats.truncated
            );
        }
        if !show_progress {
            for f in &output.failures {
                eprintln!("  {} {}", red("✗"), f);
            }
            eprintln!(
                "Watermarked {}/{} images in {}ms",
                output.stats.processed,
                output.stats.processed + output.stats.failed,
                output.stats.duration_ms
            );
        }
        for p in &paths {
            println!("{}", p.display());
        }
        if !paths.is_empty() {
            eprintln!("   →  {}", bold(&args.out_dir.display().to_string()));
        }
    }
    Ok(())
}

async fn run_caption(cli: &Cli, args: &CaptionArgs) -> Result<()> {
    let system_prompt = if let Some(ref path) = args.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = CaptionConfig::builder()
        .provider(args.provider.into())
        .endpoint(&args.endpoint)
        .direct_provider(&args.direct_provider)
        .direct_api_key_env(&args.api_key_env)
        .request_timeout_secs(args.api_timeout);
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.proxy_model(model).direct_model(model);
    }
    let config = builder.build().context("Invalid configuration")?;
    let generator = build_generator(&config).context("Failed to set up caption generator")?;

    let store = Arc::new(DestinationStore::open_file(&args.store.store));
    let destinations: Vec<Destination> = args.pages.iter().map(|p| Destination::parse(p)).collect();
    let destinations = fill_contacts_from_store(&store, &destinations);

    let request = CaptionRequest::new(&args.topic, args.framework.into());
    let store_ref = if args.no_save { None } else { Some(&store) };

    let posts = match generate_posts(generator.as_ref(), store_ref, &request, &destinations).await {
        Ok(posts) => posts,
        Err(failure) => {
            if cli.json {
                println!("{}", serde_json::json!({ "error": failure.0 }));
            } else {
                eprintln!("{} {}", red("✘"), failure);
            }
            std::process::exit(1);
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&posts).context("Failed to serialise output")?
        );
        return Ok(());
    }

    for (i, post) in posts.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", bold(&format!("── {} ──", post.destination_label)));
        println!("{}", post.final_caption);
    }
    Ok(())
}

fn run_pages(cli: &Cli, args: &StoreArgs) -> Result<()> {
    let store = DestinationStore::open_file(&args.store);
    let entries = store.entries();

    if cli.json {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|d| (d.identifier, serde_json::Value::String(d.contact_text)))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&map).context("Failed to serialise pages")?
        );
        return Ok(());
    }

    if entries.is_empty() {
        if !cli.quiet {
            eprintln!("No saved pages in {}", args.store.display());
        }
        return Ok(());
    }
    for d in entries {
        let contact = d.contact_text.replace('\n', " ⏎ ");
        println!("{}  {}", bold(&d.identifier), dim(&contact));
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = social_postkit::ServerConfig {
        listen_addr: args.listen.clone(),
        upstream_base_url: args.upstream_url.clone(),
        upstream_timeout_secs: args.upstream_timeout,
        ..social_postkit::ServerConfig::from_env()
    };
    social_postkit::server::serve(config)
        .await
        .context("Caption backend failed")
}
