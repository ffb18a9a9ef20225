//! Progress-callback trait for per-page optimisation events.
//!
//! Inject an [`Arc<dyn OptimizeProgressCallback>`] via
//! [`crate::config::OptimizeConfigBuilder::progress_callback`] to receive
//! events as pages are added to the output document. The pipeline also
//! logs a `Processed N/M pages...` line on its own, so a callback is only
//! needed when the host wants something richer (a progress bar, a job
//! record).
//!
//! # Example
//!
//! ```rust
//! use pdfspool::{OptimizeConfig, OptimizeProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl OptimizeProgressCallback for Counter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _bytes: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = OptimizeConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as each page lands in the output document.
///
/// Events arrive in page order from a single task, but that task is not
/// necessarily the caller's thread, hence `Send + Sync`. All methods have
/// no-op defaults.
pub trait OptimizeProgressCallback: Send + Sync {
    /// Called once the source document is open and its page count known.
    fn on_optimize_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after page `page_num` (1-indexed) has been embedded.
    ///
    /// `encoded_bytes` is the size of the page's JPEG stream.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_bytes: usize) {
        let _ = (page_num, total_pages, encoded_bytes);
    }

    /// Called once after the output document has been saved.
    fn on_optimize_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl OptimizeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OptimizeConfig`].
pub type ProgressCallback = Arc<dyn OptimizeProgressCallback>;

/// Whether a progress line is due after `done` of `total` pages.
///
/// Fires on every multiple of `interval`, and once more for the final page
/// when the total is not a multiple.
pub(crate) fn is_progress_due(done: usize, total: usize, interval: usize) -> bool {
    if interval == 0 || done == 0 {
        return false;
    }
    done % interval == 0 || done == total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        bytes: AtomicUsize,
        finished_total: AtomicUsize,
    }

    impl OptimizeProgressCallback for TrackingCallback {
        fn on_optimize_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, encoded_bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.bytes.fetch_add(encoded_bytes, Ordering::SeqCst);
        }

        fn on_optimize_complete(&self, total_pages: usize) {
            self.finished_total.store(total_pages, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_optimize_start(5);
        cb.on_page_complete(1, 5, 42);
        cb.on_optimize_complete(5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            started_total: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
            finished_total: AtomicUsize::new(0),
        };

        tracker.on_optimize_start(2);
        tracker.on_page_complete(1, 2, 100);
        tracker.on_page_complete(2, 2, 250);
        tracker.on_optimize_complete(2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.bytes.load(Ordering::SeqCst), 350);
        assert_eq!(tracker.finished_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn progress_due_every_interval_and_at_end() {
        let due: Vec<usize> = (1..=25).filter(|&d| is_progress_due(d, 25, 10)).collect();
        assert_eq!(due, vec![10, 20, 25]);
    }

    #[test]
    fn progress_not_duplicated_on_exact_multiple() {
        let due: Vec<usize> = (1..=20).filter(|&d| is_progress_due(d, 20, 10)).collect();
        assert_eq!(due, vec![10, 20]);
    }

    #[test]
    fn progress_never_due_for_zero() {
        assert!(!is_progress_due(0, 0, 10));
        assert!(!is_progress_due(3, 5, 0));
    }
}
