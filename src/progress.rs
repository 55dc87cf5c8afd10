//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn RestoreProgressCallback>`] via
//! [`crate::config::RestoreConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and the repair loop.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a WebSocket, or a UI
//! status line without the library knowing how the host application
//! communicates. The trait is `Send + Sync` because detection and
//! whole-image enhancement run concurrently.

use crate::types::EnhancementMethod;
use std::sync::Arc;

/// Called by the pipeline as it moves through preflight, detection,
/// enhancement, and each region-repair iteration.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RestoreProgressCallback: Send + Sync {
    /// Called after preflight succeeds, before any pipeline work.
    fn on_preflight_complete(&self) {}

    /// Called when detection finishes.
    ///
    /// `blocks` is the number of text blocks found; `None` means neither
    /// detection backend could be reached at all.
    fn on_detection_complete(&self, blocks: Option<usize>) {
        let _ = blocks;
    }

    /// Called when whole-image enhancement finishes.
    fn on_enhancement_complete(&self, method: EnhancementMethod, success: bool) {
        let _ = (method, success);
    }

    /// Called before each region-repair call. `index` is 0-based.
    fn on_region_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a region's repaired patch was pasted into the working image.
    fn on_region_repaired(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a region's repair failed; the working image is unchanged
    /// for that region and the loop continues.
    fn on_region_failed(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the final image has been assembled.
    fn on_run_complete(&self, regions_repaired: usize, regions_failed: usize) {
        let _ = (regions_repaired, regions_failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RestoreProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RestoreConfig`].
pub type ProgressCallback = Arc<dyn RestoreProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        repaired: AtomicUsize,
        failed: AtomicUsize,
    }

    impl RestoreProgressCallback for TrackingCallback {
        fn on_region_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_region_repaired(&self, _index: usize, _total: usize) {
            self.repaired.fetch_add(1, Ordering::SeqCst);
        }
        fn on_region_failed(&self, _index: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_preflight_complete();
        cb.on_detection_complete(Some(3));
        cb.on_enhancement_complete(EnhancementMethod::PrimaryLocal, true);
        cb.on_region_start(0, 2);
        cb.on_region_repaired(0, 2);
        cb.on_region_failed(1, 2, "backend down");
        cb.on_run_complete(1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            starts: AtomicUsize::new(0),
            repaired: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        };
        cb.on_region_start(0, 2);
        cb.on_region_repaired(0, 2);
        cb.on_region_start(1, 2);
        cb.on_region_failed(1, 2, "timeout");
        assert_eq!(cb.starts.load(Ordering::SeqCst), 2);
        assert_eq!(cb.repaired.load(Ordering::SeqCst), 1);
        assert_eq!(cb.failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn RestoreProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_preflight_complete();
        cb.on_detection_complete(None);
    }
}
