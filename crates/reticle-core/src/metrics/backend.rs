use std::sync::Arc;

use crate::result::Stage;

/// Final outcome of a submission for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Created,
    Failed,
}

impl SubmissionOutcome {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Created => "created",
            SubmissionOutcome::Failed => "failed",
        }
    }
}

/// Metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a finished submission and how long the whole sequence took.
    fn record_submission(&self, outcome: SubmissionOutcome, duration_ms: u64);

    /// Record the stage a failed submission stopped at.
    fn record_stage_failure(&self, stage: Stage);
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;
