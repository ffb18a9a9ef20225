//! The optimisation driver: validate, render, encode, assemble, report.
//!
//! Rendering runs on one blocking thread and pushes pages into a bounded
//! channel. Encoding fans out over `spawn_blocking`, at most
//! `config.concurrency` pages at a time, and `buffered` hands results back
//! in page order, so the output document is assembled strictly by index
//! while the CPU-heavy JPEG work overlaps. The channel bound keeps only a
//! handful of full-resolution rasters alive at any moment.

use crate::config::OptimizeConfig;
use crate::error::SpoolError;
use crate::output::OptimizeStats;
use crate::pipeline::assemble::OutputDocument;
use crate::pipeline::encode::{self, EncodedPage};
use crate::pipeline::input;
use crate::pipeline::render::{PdfiumRasterizer, RasterEvent, Rasterizer, RenderRequest};
use crate::pipeline::report::SizeReport;
use crate::progress::is_progress_due;
use futures::stream::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Flatten `input` into a grayscale, image-only PDF at `output`.
///
/// Every page of the source is rendered at `config.dpi`, reduced to a
/// single luma channel, JPEG-encoded and placed on a new page with the
/// source page's exact size. The result is written atomically: on any
/// error `output` is left as it was.
///
/// # Errors
/// - [`SpoolError::FileNotFound`] when `input` does not exist. Checked
///   before anything else; nothing is opened or written.
/// - [`SpoolError::InvalidConfig`] when `config` fails validation.
/// - Any other variant for failures while opening, rendering, encoding or
///   saving.
///
/// # Example
/// ```rust,no_run
/// use pdfspool::{optimize, OptimizeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = optimize("notes.pdf", "notes-spool.pdf", &OptimizeConfig::default()).await?;
/// println!("{} pages", stats.page_count);
/// # Ok(())
/// # }
/// ```
pub async fn optimize(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &OptimizeConfig,
) -> Result<OptimizeStats, SpoolError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();

    // ── Step 1: Validate input and config ────────────────────────────────
    let pdf_path = input::resolve_local(input)?;
    config.validate()?;

    info!(
        "Starting optimization for: {} at {} DPI (Grayscale)",
        display_name(input),
        config.dpi
    );

    // ── Step 2: Start the renderer ───────────────────────────────────────
    let rasterizer: Arc<dyn Rasterizer> = match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new()),
    };
    let request = RenderRequest {
        dpi: config.dpi,
        password: config.password.clone(),
    };

    let (tx, mut rx) = mpsc::channel::<RasterEvent>(config.concurrency + 1);
    let render_start = Instant::now();
    let render_path = pdf_path.clone();
    let render_task = tokio::task::spawn_blocking(move || {
        let mut sink = |event: RasterEvent| {
            tx.blocking_send(event)
                .map_err(|_| SpoolError::Internal("page consumer stopped early".into()))
        };
        rasterizer
            .rasterize(&render_path, &request, &mut sink)
            .map(|emitted| (emitted, render_start.elapsed()))
    });

    let total_pages = match rx.recv().await {
        Some(RasterEvent::Opened { page_count }) => page_count,
        Some(RasterEvent::Page(page)) => {
            return Err(SpoolError::Internal(format!(
                "renderer sent page {} before opening the document",
                page.index + 1
            )));
        }
        None => {
            // The renderer gave up before opening; its error is the real cause.
            join_render(render_task).await?;
            return Err(SpoolError::Internal(
                "renderer finished without opening the document".into(),
            ));
        }
    };
    info!("Total pages to process: {}", total_pages);

    if let Some(ref cb) = config.progress_callback {
        cb.on_optimize_start(total_pages);
    }

    // ── Step 3: Encode in parallel, assemble in order ────────────────────
    let quality = config.jpeg_quality;
    let mut encoded = ReceiverStream::new(rx)
        .map(move |event| encode_event(event, quality))
        .buffered(config.concurrency);

    let mut document = OutputDocument::new();
    while let Some(result) = encoded.next().await {
        let page = result?;
        let page_num = page.index + 1;
        let encoded_bytes = page.jpeg.len();
        document.push_page(page)?;

        let done = document.len();
        if is_progress_due(done, total_pages, config.progress_interval) {
            info!("Processed {}/{} pages...", done, total_pages);
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, total_pages, encoded_bytes);
        }
    }
    drop(encoded);

    let (rendered, render_elapsed) = join_render(render_task).await?;
    let render_duration_ms = render_elapsed.as_millis() as u64;
    if rendered != total_pages || document.len() != total_pages {
        return Err(SpoolError::Internal(format!(
            "renderer announced {} pages but produced {} ({} assembled)",
            total_pages,
            rendered,
            document.len()
        )));
    }
    debug!("Rendered {} pages in {}ms", rendered, render_duration_ms);

    // ── Step 4: Save ─────────────────────────────────────────────────────
    let output_path = output.to_path_buf();
    tokio::task::spawn_blocking(move || document.save(&output_path))
        .await
        .map_err(|e| SpoolError::Internal(format!("Save task panicked: {}", e)))??;

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Optimization complete. Saved to: {}. Time taken: {:.2}s",
        display_name(output),
        total_duration_ms as f64 / 1000.0
    );

    // ── Step 5: Report ───────────────────────────────────────────────────
    let sizes = match SizeReport::from_files(&pdf_path, output) {
        Ok(report) => {
            report.log();
            Some(report)
        }
        Err(e) => {
            warn!("Could not compare file sizes: {}", e);
            None
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_optimize_complete(total_pages);
    }

    Ok(OptimizeStats {
        page_count: total_pages,
        dpi: config.dpi,
        total_duration_ms,
        render_duration_ms,
        sizes,
    })
}

/// Synchronous wrapper around [`optimize`].
///
/// Creates a temporary tokio runtime internally.
pub fn optimize_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &OptimizeConfig,
) -> Result<OptimizeStats, SpoolError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SpoolError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(optimize(input, output, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn encode_event(event: RasterEvent, quality: u8) -> Result<EncodedPage, SpoolError> {
    let page = match event {
        RasterEvent::Page(page) => page,
        RasterEvent::Opened { .. } => {
            return Err(SpoolError::Internal(
                "renderer opened the document twice".into(),
            ));
        }
    };

    let page_num = page.index + 1;
    tokio::task::spawn_blocking(move || encode::encode_page(page, quality))
        .await
        .map_err(|e| SpoolError::EncodingFailed {
            page: page_num,
            detail: format!("encode task panicked: {}", e),
        })?
}

async fn join_render<T>(task: JoinHandle<Result<T, SpoolError>>) -> Result<T, SpoolError> {
    task.await
        .map_err(|e| SpoolError::Internal(format!("Render task panicked: {}", e)))?
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
