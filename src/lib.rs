//! # pdfspool
//!
//! Shrink PDF documents for print spooling by flattening every page into a
//! low-resolution grayscale JPEG.
//!
//! ## Why this crate?
//!
//! Lecture notes, exam papers and scanned handouts are often far larger than
//! a monochrome printer needs: embedded colour photos, font programs and
//! vector art all have to be shipped to the spooler and rendered there.
//! Replacing each page with a single 100 DPI gray image trades editability
//! for a small, uniform document that every printer can consume quickly.
//! Page sizes are preserved exactly; only the pixel content changes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     existence + %PDF checks, before anything is opened
//!  ├─ 2. Render    rasterise each page via pdfium (spawn_blocking)
//!  ├─ 3. Encode    drop colour + alpha → 8-bit gray JPEG (parallel)
//!  ├─ 4. Assemble  one page per source page, same MediaBox, in order
//!  ├─ 5. Save      prune unreferenced objects, deflate, atomic rename
//!  └─ 6. Report    original vs optimised size
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfspool::{optimize, OptimizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OptimizeConfig::builder().dpi(100).build()?;
//!     let stats = optimize("notes.pdf", "notes-print.pdf", &config).await?;
//!     if let Some(ratio) = stats.sizes.and_then(|s| s.ratio_percent()) {
//!         eprintln!("{} pages, {:.1}% of original", stats.page_count, ratio);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfspool` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OptimizeConfig, OptimizeConfigBuilder};
pub use error::{ErrorKind, SpoolError};
pub use optimize::{optimize, optimize_sync};
pub use output::OptimizeStats;
pub use pipeline::render::{
    PageGeometry, PdfiumRasterizer, RasterEvent, RasterPage, RasterSink, Rasterizer,
    RenderRequest,
};
pub use pipeline::report::SizeReport;
pub use progress::{NoopProgressCallback, OptimizeProgressCallback, ProgressCallback};
