use crate::metrics::backend::{MetricsBackend, SubmissionOutcome};
use crate::result::Stage;

/// Backend that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_submission(&self, _: SubmissionOutcome, _: u64) {}

    #[inline(always)]
    fn record_stage_failure(&self, _: Stage) {}
}
