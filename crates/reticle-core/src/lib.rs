//! Workload provisioning: turns a validated [`Profile`](reticle_model::Profile) into a
//! ConfigMap, an optional PersistentVolumeClaim and a Job, submitted in dependency order and
//! linked for cascading deletion.
pub mod builder;
pub mod cluster;
pub mod config;
pub mod error;
pub mod metrics;
pub mod naming;
pub mod provisioner;
pub mod result;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use builder::{ResourceBuilder, ResourceSet};
pub use cluster::{ClusterApi, ClusterConnector, ClusterError, ClusterResult, SharedCluster};
pub use config::{AcceleratorPolicy, CachePolicy, CleanupPolicy, WorkloadConfig};
pub use error::{BuildError, ConfigError, ProvisionError};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, SubmissionOutcome, noop_metrics};
pub use naming::{FixedNames, NameGenerator, UuidNames};
pub use provisioner::Provisioner;
pub use result::{Stage, SubmissionResult};
