//! Metrics seam for submissions.
//!
//! Backends (prometheus, ...) implement [`MetricsBackend`] and are handed to the
//! [`Provisioner`](crate::Provisioner).
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, SubmissionOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
