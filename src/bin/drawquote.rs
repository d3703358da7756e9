//! CLI binary for drawing-quote.
//!
//! A thin shim over the library crate: maps flags to `QuoteParams` /
//! `EstimatorConfig`, runs one quote or starts the HTTP server.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use drawing_quote::server::{self, AppState, ServerConfig};
use drawing_quote::{
    quote_image_file, quote_text, CostEstimator, EstimationResult, EstimatorConfig,
    GoogleVisionOcr, OcrConfig, OcrEngine, QuoteParams,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Quote a photographed drawing (needs GOOGLE_VISION_API_KEY)
  drawquote image bracket.jpg --stueckzahl 25 --material stahl

  # Quote from text that was already recognised
  drawquote text drawing.txt --material kupfer --json

  # Pipe text in
  echo "Platte 200mm 80mm 12mm" | drawquote text -

  # Run the HTTP service on port 3001
  drawquote serve --bind 0.0.0.0:3001

  # Use a custom price list / pricing model
  drawquote --config shop.json image part.png

MATERIALS (default price list, €/kg, g/cm³):
  aluminium   7.00  2.70   (default, also used for unknown names)
  edelstahl   6.50  7.90
  stahl       1.50  7.85
  messing     8.00  8.50
  kupfer     10.00  8.96

ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY   Cloud Vision API key for `image` and `serve`
  GOOGLE_VISION_ENDPOINT  Override the images:annotate endpoint
  PORT                    Port for `serve` when --bind is not given
"#;

/// Estimate machining quotes from photographed technical drawings.
#[derive(Parser, Debug)]
#[command(
    name = "drawquote",
    version,
    about = "Estimate machining quotes from photographed technical drawings",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file overriding the price list and pricing model.
    #[arg(long, global = true, env = "DRAWQUOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DRAWQUOTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, global = true, env = "DRAWQUOTE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR an image file and quote it.
    Image {
        /// Path to the photographed drawing.
        path: PathBuf,

        #[command(flatten)]
        quote: QuoteArgs,

        /// OCR call timeout in seconds.
        #[arg(long, env = "DRAWQUOTE_OCR_TIMEOUT", default_value_t = 30)]
        ocr_timeout: u64,
    },

    /// Quote already-recognised text from a file, or `-` for stdin.
    Text {
        path: String,

        #[command(flatten)]
        quote: QuoteArgs,
    },

    /// Run the HTTP service.
    Serve {
        /// Address to bind. Defaults to 0.0.0.0 on $PORT or 3001.
        #[arg(long, env = "DRAWQUOTE_BIND")]
        bind: Option<SocketAddr>,

        /// Maximum upload size in MiB.
        #[arg(long, env = "DRAWQUOTE_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,
    },
}

#[derive(Args, Debug)]
struct QuoteArgs {
    /// Number of parts ordered.
    #[arg(short = 'n', long, default_value = "1")]
    stueckzahl: String,

    /// Material name (aluminium, edelstahl, stahl, messing, kupfer, …).
    #[arg(short, long, default_value = "aluminium")]
    material: String,

    /// Print the quote as JSON, as the HTTP service would.
    #[arg(long)]
    json: bool,
}

impl QuoteArgs {
    fn params(&self) -> QuoteParams {
        QuoteParams::from_form(Some(&self.stueckzahl), Some(&self.material))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let serving = matches!(cli.command, Command::Serve { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !serving {
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

    let estimator = CostEstimator::new(load_config(cli.config.as_ref())?);

    match &cli.command {
        Command::Image {
            path,
            quote,
            ocr_timeout,
        } => {
            let ocr = GoogleVisionOcr::new(OcrConfig {
                timeout_secs: *ocr_timeout,
                ..OcrConfig::from_env()
            })
            .context("OCR backend unavailable")?;

            let spinner = (!cli.quiet).then(|| ocr_spinner(path));
            let result = quote_image_file(path, &quote.params(), &estimator, &ocr).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let result = result.context("Analysis failed")?;
            print_result(&result, quote.json, cli.quiet)?;
        }
        Command::Text { path, quote } => {
            let text = read_text(path)?;
            let result = quote_text(text, &quote.params(), &estimator);
            print_result(&result, quote.json, cli.quiet)?;
        }
        Command::Serve {
            bind,
            max_upload_mb,
        } => {
            let ocr: Arc<dyn OcrEngine> =
                Arc::new(GoogleVisionOcr::from_env().context("OCR backend unavailable")?);
            let mut config = ServerConfig::from_env();
            if let Some(bind) = bind {
                config.bind = *bind;
            }
            config.max_upload_bytes = max_upload_mb.saturating_mul(1024 * 1024);

            server::serve(AppState::new(estimator, ocr), config)
                .await
                .context("Server failed")?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<EstimatorConfig> {
    match path {
        Some(path) => EstimatorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Ok(EstimatorConfig::default()),
    }
}

fn read_text(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    }
}

fn ocr_spinner(path: &std::path::Path) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("OCR");
    bar.set_message(path.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_result(result: &EstimationResult, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialise result")?
        );
        return Ok(());
    }

    match result {
        EstimationResult::ManualReview => {
            println!(
                "{} {}",
                yellow("⚠"),
                bold("Micron tolerance found: this drawing needs a manual quote.")
            );
        }
        EstimationResult::Quote(q) => {
            println!("{} {}", green("✔"), bold(&format!("{:.2} per part", q.price)));
            println!(
                "   Dimensions:    {} × {} × {} mm",
                q.length_mm, q.width_mm, q.thickness_mm
            );
            println!("   Material:      {}", q.material);
            println!("   Raw weight:    {:.3} kg", q.raw_weight_kg);
            println!("   Material cost: {:.2}", q.material_cost);
            println!("   Runtime:       {:.1} min", q.runtime_minutes);
            if !quiet && !q.text_excerpt.is_empty() {
                println!("{}", dim(&format!("   Text: {:?}", q.text_excerpt)));
            }
        }
    }
    Ok(())
}
