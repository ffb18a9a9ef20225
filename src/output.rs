//! Result types returned by a successful optimisation run.

use crate::pipeline::report::SizeReport;
use serde::{Deserialize, Serialize};

/// Statistics for one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeStats {
    /// Pages in the output document. Always equal to the source page count.
    pub page_count: usize,
    /// Resolution the pages were rasterised at.
    pub dpi: u32,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
    /// Time from starting the renderer until it returned after handing over
    /// its last page. Encoding overlaps with this window; assembly of pages
    /// still queued in the channel may continue past it.
    pub render_duration_ms: u64,
    /// Size comparison, or `None` if either file could not be inspected
    /// after the run.
    pub sizes: Option<SizeReport>,
}
