//! File-size comparison between the source and the optimised PDF.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Sizes of the two documents as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub optimized_bytes: u64,
}

impl SizeReport {
    pub fn new(original_bytes: u64, optimized_bytes: u64) -> Self {
        Self {
            original_bytes,
            optimized_bytes,
        }
    }

    /// Stat both files.
    pub fn from_files(original: &Path, optimized: &Path) -> std::io::Result<Self> {
        Ok(Self::new(
            std::fs::metadata(original)?.len(),
            std::fs::metadata(optimized)?.len(),
        ))
    }

    pub fn original_mb(&self) -> f64 {
        self.original_bytes as f64 / BYTES_PER_MB
    }

    pub fn optimized_mb(&self) -> f64 {
        self.optimized_bytes as f64 / BYTES_PER_MB
    }

    /// Optimised size as a percentage of the original, or `None` for an
    /// empty original.
    pub fn ratio_percent(&self) -> Option<f64> {
        if self.original_bytes == 0 {
            None
        } else {
            Some(self.optimized_bytes as f64 / self.original_bytes as f64 * 100.0)
        }
    }

    /// Write the report to the log.
    pub fn log(&self) {
        info!("Original Size: {:.2} MB", self.original_mb());
        info!("Optimized Size: {:.2} MB", self.optimized_mb());
        if let Some(ratio) = self.ratio_percent() {
            info!("Output is {:.2}% of original size.", ratio);
        }
    }
}
