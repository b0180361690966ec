//! Prometheus metrics backend for reticle submissions.
//!
//! [`PrometheusMetrics`] implements [`reticle_core::MetricsBackend`]; hand an `Arc` of it to the
//! provisioner and serve [`PrometheusMetrics::render`] from the application's HTTP server.
//!
//! ## Metrics
//! - `reticle_submissions_total{outcome}` - Counter
//! - `reticle_submission_duration_seconds` - Histogram
//! - `reticle_stage_failures_total{stage}` - Counter
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
