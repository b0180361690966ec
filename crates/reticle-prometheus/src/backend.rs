use std::sync::Arc;

use prometheus::{
    CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder, proto::MetricFamily,
};

use reticle_core::{MetricsBackend, Stage, SubmissionOutcome};

/// Prometheus metrics backend for reticle.
///
/// Label values are bounded: `outcome` is `created` or `failed`, `stage` is one of the
/// [`Stage`] labels.
#[derive(Clone)]
pub struct PrometheusMetrics {
    submissions: CounterVec,
    duration: Histogram,
    stage_failures: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let submissions = CounterVec::new(
            Opts::new("submissions_total", "Total number of finished submissions")
                .namespace("reticle"),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions.clone()))?;

        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "submission_duration_seconds",
                "Time from request to the last cluster call, in seconds",
            )
            .namespace("reticle")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(duration.clone()))?;

        let stage_failures = CounterVec::new(
            Opts::new("stage_failures_total", "Failed submissions by stage").namespace("reticle"),
            &["stage"],
        )?;
        registry.register(Box::new(stage_failures.clone()))?;

        Ok(Self {
            submissions,
            duration,
            stage_failures,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with default registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition of everything in the registry, for a `/metrics` endpoint.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_submission(&self, outcome: SubmissionOutcome, duration_ms: u64) {
        self.submissions
            .with_label_values(&[outcome.as_label()])
            .inc();

        let duration_seconds = duration_ms as f64 / 1000.0;
        self.duration.observe(duration_seconds);
    }

    fn record_stage_failure(&self, stage: Stage) {
        self.stage_failures
            .with_label_values(&[stage.as_str()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("{name} not found"))
    }

    #[test]
    fn submissions_are_counted_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_submission(SubmissionOutcome::Created, 120);
        metrics.record_submission(SubmissionOutcome::Created, 80);
        metrics.record_submission(SubmissionOutcome::Failed, 30);

        let families = metrics.gather();
        assert_eq!(
            family(&families, "reticle_submissions_total")
                .get_metric()
                .len(),
            2
        );
        family(&families, "reticle_submission_duration_seconds");
        let text = metrics.render().unwrap();
        assert!(text.contains("reticle_submission_duration_seconds_count 3"), "{text}");
    }

    #[test]
    fn stage_failures_are_labelled() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_stage_failure(Stage::ExecutionUnit);
        metrics.record_stage_failure(Stage::ExecutionUnit);
        metrics.record_stage_failure(Stage::Connect);

        let families = metrics.gather();
        assert_eq!(
            family(&families, "reticle_stage_failures_total")
                .get_metric()
                .len(),
            2
        );
    }

    #[test]
    fn render_produces_text_exposition() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_stage_failure(Stage::OwnerLinkCache);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"reticle_stage_failures_total{stage="owner_link_cache"} 1"#), "{text}");
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
