//! RAII-based timing for version-control operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_util::timing::TimingGuard;
//!
//! fn replay(path: &[Revision]) {
//!     let _timing = TimingGuard::replay(path.len());
//!     // ... apply every item on the path ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// RAII guard that measures and logs the duration of an operation.
///
/// Fast operations are logged at debug, slow ones at info, and very slow
/// ones at warn.
pub struct TimingGuard {
    /// Type of operation (e.g., "replay", "diff")
    operation_type: &'static str,
    /// Free-form detail (revision id, item count)
    detail: String,
    start: Instant,
    info_threshold_ms: u64,
    warn_threshold_ms: u64,
}

impl TimingGuard {
    /// Create a new timing guard.
    pub fn new(operation_type: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation_type,
            detail: detail.into(),
            start: Instant::now(),
            info_threshold_ms: 100,
            warn_threshold_ms: 2000,
        }
    }

    /// Timing guard for a snapshot replay over `path_len` revisions.
    pub fn replay(path_len: usize) -> Self {
        Self::new("replay", format!("{path_len} revisions"))
    }

    /// Timing guard for a working diff pass.
    pub fn diff_pass(generation: u64) -> Self {
        Self::new("diff", format!("generation {generation}"))
    }

    /// Set the threshold for info-level logging (in milliseconds).
    pub fn with_info_threshold(mut self, ms: u64) -> Self {
        self.info_threshold_ms = ms;
        self
    }

    /// Set the threshold for warn-level logging (in milliseconds).
    pub fn with_warn_threshold(mut self, ms: u64) -> Self {
        self.warn_threshold_ms = ms;
        self
    }

    /// Get the elapsed time so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis() as u64;

        if duration_ms >= self.warn_threshold_ms {
            warn!(
                operation_type = self.operation_type,
                detail = %self.detail,
                duration_ms,
                "Slow operation completed"
            );
        } else if duration_ms >= self.info_threshold_ms {
            info!(
                operation_type = self.operation_type,
                detail = %self.detail,
                duration_ms,
                "Operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                detail = %self.detail,
                duration_ms,
                "Operation completed"
            );
        }
    }
}
