use std::path::PathBuf;

use reticle_model::{ModelError, ResourceName};
use thiserror::Error;

use crate::{cluster::ClusterError, result::Stage};

/// Rejected [`WorkloadConfig`](crate::WorkloadConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid namespace '{0}': must be a DNS-1123 label")]
    Namespace(String),

    #[error("invalid role prefix '{0}': names built from it are not DNS-1123 labels")]
    RolePrefix(String),

    #[error("node selector needs both key and value")]
    HalfNodeSelector,

    #[error("accelerator {0}")]
    Accelerator(&'static str),

    #[error("cache {0}")]
    Cache(&'static str),

    #[error("worker config path {0}")]
    WorkerConfigPath(&'static str),

    #[error("backoff limit must not be negative, got {0}")]
    BackoffLimit(i32),
}

/// Failure while describing resources, before anything is sent to the cluster.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("failed to read worker config '{}': {source}", path.display())]
    WorkerConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of one submission.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("cluster connection failed: {0}")]
    Connect(#[source] ClusterError),

    #[error("{stage} failed for '{name}': {source}")]
    Step {
        stage: Stage,
        name: ResourceName,
        #[source]
        source: ClusterError,
    },
}

impl ProvisionError {
    /// Stage the submission stopped at.
    pub fn stage(&self) -> Stage {
        match self {
            ProvisionError::Build(_) => Stage::Build,
            ProvisionError::Connect(_) => Stage::Connect,
            ProvisionError::Step { stage, .. } => *stage,
        }
    }

    pub(crate) fn step(stage: Stage, name: &ResourceName, source: ClusterError) -> Self {
        ProvisionError::Step {
            stage,
            name: name.clone(),
            source,
        }
    }
}
