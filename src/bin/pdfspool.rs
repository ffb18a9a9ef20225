//! CLI binary for pdfspool.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `OptimizeConfig`, sets up logging once, and turns the result into an
//! exit code.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfspool::{
    optimize, OptimizeConfig, OptimizeProgressCallback, OptimizeStats, PdfiumRasterizer,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar driven by the pipeline's page events.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until the page count is known, then a bar.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl OptimizeProgressCallback for CliProgressCallback {
    fn on_optimize_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Flattening");
        self.bar.set_message("");
        self.bar.reset_eta();
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _encoded_bytes: usize) {
        self.bar.inc(1);
    }

    fn on_optimize_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default: 100 DPI grayscale
  pdfspool -i notes.pdf -o notes-print.pdf

  # Sharper output for small print
  pdfspool -i slides.pdf -o slides-print.pdf --dpi 150

  # Smaller still, with a progress bar
  pdfspool -i scan.pdf -o scan-print.pdf --dpi 72 --quality 60 --progress

  # Machine-readable statistics
  pdfspool -i notes.pdf -o out.pdf --json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
  RUST_LOG                Log filter (e.g. pdfspool=debug)

EXIT STATUS:
  0  the output document was written
  1  the input is missing or any processing step failed
"#;

/// Flatten and compress PDF notes to optimize print spooling.
#[derive(Parser, Debug)]
#[command(
    name = "pdfspool",
    version,
    about = "Flatten and compress PDF notes to optimize print spooling",
    long_about = "Rasterise every page of a PDF to a low-resolution grayscale JPEG and \
repackage the images into a new PDF with the original page sizes. Colour and text \
structure are discarded on purpose: the result is meant for monochrome printing.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to input PDF file.
    #[arg(short, long)]
    input: PathBuf,

    /// Path for output PDF file.
    #[arg(short, long)]
    output: PathBuf,

    /// Rasterization DPI.
    #[arg(long, env = "PDFSPOOL_DPI", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// JPEG quality of the page images (1–100).
    #[arg(long, env = "PDFSPOOL_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Pages encoded in parallel. Defaults to the number of CPUs.
    #[arg(short, long, env = "PDFSPOOL_CONCURRENCY")]
    concurrency: Option<usize>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSPOOL_PASSWORD")]
    password: Option<String>,

    /// Use the pdfium library at this path instead of the cached download.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Show a progress bar instead of per-page log lines.
    #[arg(long, env = "PDFSPOOL_PROGRESS")]
    progress: bool,

    /// Print run statistics as JSON on stdout (logs move to stderr).
    #[arg(long, env = "PDFSPOOL_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSPOOL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSPOOL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to process document: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber. Called exactly once, before any work.
fn init_logging(cli: &Cli) {
    let show_progress = cli.progress && !cli.quiet;
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // stdout is reserved for the JSON document in --json mode.
    if cli.json {
        builder.with_writer(io::stderr).init();
    } else {
        builder.with_writer(io::stdout).init();
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let show_progress = cli.progress && !cli.quiet;

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // Only checked once the input is known to exist, so a typo in the path
    // never triggers a 30 MB download.
    if cli.input.exists() && cli.pdfium_lib.is_none() && !pdfium_auto::is_pdfium_cached() {
        fetch_pdfium(show_progress)?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn OptimizeProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let stats = optimize(&cli.input, &cli.output, &config)
        .await
        .with_context(|| format!("Could not optimize '{}'", cli.input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise statistics")?
        );
    } else if show_progress {
        print_summary(&stats, cli);
    }

    Ok(())
}

/// Download pdfium into the cache, with a byte-level bar when asked for.
fn fetch_pdfium(show_progress: bool) -> Result<()> {
    if !show_progress {
        info!("Downloading PDFium engine (first run only)…");
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_and_clear();
    Ok(())
}

/// Map CLI args to `OptimizeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OptimizeConfig> {
    let mut builder = OptimizeConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.quality);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.rasterizer(Arc::new(PdfiumRasterizer::with_library(lib)));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// One-line summary for progress-bar mode, where INFO logs are muted.
fn print_summary(stats: &OptimizeStats, cli: &Cli) {
    let ratio = stats
        .sizes
        .and_then(|s| s.ratio_percent())
        .map(|r| format!("  {:.2}% of original", r))
        .unwrap_or_default();
    eprintln!(
        "✔ {} pages  {}ms  →  {}{}",
        stats.page_count,
        stats.total_duration_ms,
        cli.output.display(),
        ratio
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn dpi_defaults_to_100() {
        let cli = Cli::try_parse_from(["pdfspool", "-i", "a.pdf", "-o", "b.pdf"]).unwrap();
        assert_eq!(cli.dpi, 100);
        assert_eq!(cli.quality, 95);
        assert_eq!(cli.input, PathBuf::from("a.pdf"));
        assert_eq!(cli.output, PathBuf::from("b.pdf"));
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["pdfspool", "-i", "a.pdf"]).is_err());
    }

    #[test]
    fn zero_dpi_rejected_by_parser() {
        assert!(Cli::try_parse_from(["pdfspool", "-i", "a", "-o", "b", "--dpi", "0"]).is_err());
    }

    #[test]
    fn config_carries_flags() {
        let cli = Cli::try_parse_from([
            "pdfspool", "--input", "a.pdf", "--output", "b.pdf", "--dpi", "150",
            "--quality", "70", "-c", "3",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, 150);
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.concurrency, 3);
        assert!(config.rasterizer.is_none());
    }
}
