//! Configuration types for PDF spool optimisation.
//!
//! Every knob lives in [`OptimizeConfig`], built via its
//! [`OptimizeConfigBuilder`]. The defaults reproduce the behaviour spool
//! operators expect out of the box: 100 DPI grayscale pages, progress logged
//! every 10 pages.

use crate::error::SpoolError;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default rasterisation resolution. Plenty for text-dominant documents
/// such as lecture notes and exam papers.
pub const DEFAULT_DPI: u32 = 100;

/// Default JPEG quality for the embedded page images.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default number of pages between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Configuration for one optimisation run.
///
/// Built via [`OptimizeConfig::builder()`] or using
/// [`OptimizeConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfspool::OptimizeConfig;
///
/// let config = OptimizeConfig::builder()
///     .dpi(150)
///     .jpeg_quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct OptimizeConfig {
    /// Rasterisation DPI. Must be at least 1; there is no upper bound.
    /// Default: 100.
    ///
    /// DPI only changes the pixel density of the page image. The output page
    /// always keeps the physical size of the source page.
    pub dpi: u32,

    /// JPEG quality (1–100) used for every page image. Default: 95.
    pub jpeg_quality: u8,

    /// Maximum number of pages being grayscale-converted and JPEG-encoded at
    /// the same time. Default: number of available CPUs.
    ///
    /// Rendering itself is sequential (pdfium is single-threaded); encoding
    /// is the part that fans out. Output order never depends on this value.
    pub concurrency: usize,

    /// Emit a progress log line every this many pages. Default: 10.
    pub progress_interval: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Pre-constructed rendering engine. When `None` the pipeline uses
    /// [`crate::pipeline::render::PdfiumRasterizer`].
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Optional per-page progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            concurrency: default_concurrency(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            password: None,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OptimizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizeConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("concurrency", &self.concurrency)
            .field("progress_interval", &self.progress_interval)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl OptimizeConfig {
    /// Create a new builder for `OptimizeConfig`.
    pub fn builder() -> OptimizeConfigBuilder {
        OptimizeConfigBuilder {
            config: Self::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`OptimizeConfig`].
#[derive(Debug)]
pub struct OptimizeConfigBuilder {
    config: OptimizeConfig,
}

impl OptimizeConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_interval(mut self, pages: usize) -> Self {
        self.config.progress_interval = pages.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OptimizeConfig, SpoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl OptimizeConfig {
    /// Check the invariants the builder enforces. Called again by the
    /// pipeline because the fields are public.
    pub fn validate(&self) -> Result<(), SpoolError> {
        if self.dpi == 0 {
            return Err(SpoolError::InvalidConfig(
                "DPI must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(SpoolError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                self.jpeg_quality
            )));
        }
        if self.concurrency == 0 {
            return Err(SpoolError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(SpoolError::InvalidConfig(
                "Progress interval must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spool_profile() {
        let c = OptimizeConfig::default();
        assert_eq!(c.dpi, 100);
        assert_eq!(c.jpeg_quality, 95);
        assert_eq!(c.progress_interval, 10);
        assert!(c.concurrency >= 1);
        assert!(c.password.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_dpi_rejected() {
        let err = OptimizeConfig::builder().dpi(0).build().unwrap_err();
        assert!(err.to_string().contains("DPI"), "got: {err}");
    }

    #[test]
    fn large_dpi_accepted() {
        let c = OptimizeConfig::builder().dpi(1200).build().unwrap();
        assert_eq!(c.dpi, 1200);
    }

    #[test]
    fn quality_out_of_range_rejected() {
        assert!(OptimizeConfig::builder().jpeg_quality(0).build().is_err());
        assert!(OptimizeConfig::builder().jpeg_quality(101).build().is_err());
        assert!(OptimizeConfig::builder().jpeg_quality(1).build().is_ok());
    }

    #[test]
    fn concurrency_and_interval_clamped() {
        let c = OptimizeConfig::builder()
            .concurrency(0)
            .progress_interval(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.progress_interval, 1);
    }

    #[test]
    fn debug_redacts_password() {
        let c = OptimizeConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
