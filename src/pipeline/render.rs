//! PDF rasterisation: the boundary between pdfspool and the rendering engine.
//!
//! [`Rasterizer`] is the seam. The pipeline hands it a path and a
//! [`RenderRequest`] and receives [`RasterEvent`]s through a sink: one
//! `Opened` with the page count, then one `Page` per source page in index
//! order. [`PdfiumRasterizer`] is the production engine; tests inject their
//! own.
//!
//! ## Why a push-style sink?
//!
//! pdfium documents borrow the `Pdfium` bindings, so an open document cannot
//! be handed across threads or stored next to its bindings. Driving the whole
//! open → render → close sequence inside one call keeps the borrow local and
//! guarantees the document is closed on every exit path, while the sink
//! lets the caller stream pages onwards one at a time instead of buffering
//! the whole document.

use crate::error::SpoolError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Physical size of a page in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Bitmap size in pixels when this page is rendered at `dpi`.
    ///
    /// Each side is rounded to the nearest pixel and never drops below 1.
    pub fn pixel_dimensions(&self, dpi: u32) -> (u32, u32) {
        let scale = dpi as f32 / POINTS_PER_INCH;
        let px = |pt: f32| ((pt * scale).round() as u32).max(1);
        (px(self.width), px(self.height))
    }
}

/// One rendered page, still uncompressed.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 0-based page index in the source document.
    pub index: usize,
    /// Geometry of the source page.
    pub geometry: PageGeometry,
    /// The rendered bitmap. May still carry colour; the encode stage
    /// reduces it to a single luma channel.
    pub image: DynamicImage,
}

/// What to render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub dpi: u32,
    pub password: Option<String>,
}

/// Events pushed by a [`Rasterizer`] into the pipeline.
#[derive(Debug)]
pub enum RasterEvent {
    /// The document is open. Sent exactly once, before any page.
    Opened { page_count: usize },
    /// The next page, in index order.
    Page(RasterPage),
}

/// Receives raster events. Returning `Err` aborts rendering.
pub type RasterSink<'a> = dyn FnMut(RasterEvent) -> Result<(), SpoolError> + 'a;

/// A document rendering engine.
///
/// Implementations must emit [`RasterEvent::Opened`] once, then every page
/// in ascending index order without gaps, and must release the document on
/// every exit path. Called from a blocking thread.
pub trait Rasterizer: Send + Sync {
    /// Render every page of the PDF at `pdf_path`.
    ///
    /// Returns the number of pages emitted.
    fn rasterize(
        &self,
        pdf_path: &Path,
        request: &RenderRequest,
        sink: &mut RasterSink<'_>,
    ) -> Result<usize, SpoolError>;
}

/// [`Rasterizer`] backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind to pdfium through `pdfium-auto` (honours `PDFIUM_LIB_PATH`,
    /// otherwise uses or fills the local cache).
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the pdfium library at an explicit path.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, SpoolError> {
        let bound = match &self.library_path {
            Some(path) => pdfium_auto::bind_pdfium_from_path(path),
            None => pdfium_auto::bind_pdfium_silent(),
        };
        bound.map_err(|e| SpoolError::PdfiumBindingFailed(e.to_string()))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        request: &RenderRequest,
        sink: &mut RasterSink<'_>,
    ) -> Result<usize, SpoolError> {
        let pdfium = self.bind()?;
        let password = request.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| classify_load_error(pdf_path, password.is_some(), e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        debug!("Opened {}: {} pages", pdf_path.display(), total_pages);
        sink(RasterEvent::Opened {
            page_count: total_pages,
        })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(request.dpi as f32 / POINTS_PER_INCH)
            .use_grayscale_rendering(true);

        let mut emitted = 0;
        for (index, page) in pages.iter().enumerate() {
            let geometry = PageGeometry::new(page.width().value, page.height().value);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                SpoolError::RasterisationFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} ({}x{} pt) → {}x{} px",
                index + 1,
                geometry.width,
                geometry.height,
                image.width(),
                image.height()
            );

            sink(RasterEvent::Page(RasterPage {
                index,
                geometry,
                image,
            }))?;
            emitted += 1;
        }

        Ok(emitted)
    }
}

fn classify_load_error(pdf_path: &Path, had_password: bool, e: PdfiumError) -> SpoolError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            SpoolError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            SpoolError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        SpoolError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_100_dpi() {
        let letter = PageGeometry::new(612.0, 792.0);
        assert_eq!(letter.pixel_dimensions(100), (850, 1100));
        assert_eq!(letter.pixel_dimensions(72), (612, 792));
    }

    #[test]
    fn a4_rounds_to_nearest_pixel() {
        let a4 = PageGeometry::new(595.28, 841.89);
        assert_eq!(a4.pixel_dimensions(100), (827, 1169));
    }

    #[test]
    fn tiny_page_never_collapses_to_zero() {
        let sliver = PageGeometry::new(0.1, 0.1);
        assert_eq!(sliver.pixel_dimensions(1), (1, 1));
    }

    #[test]
    fn pixel_dimensions_monotonic_in_dpi() {
        let page = PageGeometry::new(500.0, 300.0);
        let mut prev = (0, 0);
        for dpi in [1, 36, 72, 96, 100, 150, 200, 300, 600] {
            let dims = page.pixel_dimensions(dpi);
            assert!(dims.0 >= prev.0 && dims.1 >= prev.1, "dpi {dpi}: {dims:?} < {prev:?}");
            prev = dims;
        }
    }

    #[test]
    fn unbound_library_path_reports_binding_failure() {
        let r = PdfiumRasterizer::with_library("/no/such/libpdfium.so");
        match r.bind() {
            Err(SpoolError::PdfiumBindingFailed(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("bound to a library that does not exist"),
        }
    }
}
