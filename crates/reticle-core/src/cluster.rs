//! Boundary to the cluster control plane.
//!
//! Concrete clients live in backend crates; the provisioner only sees these traits.
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cannot reach cluster: {0}")]
    Connect(String),

    #[error("api error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected object: {0}")]
    Invalid(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Namespaced create/replace/delete calls used by one submission.
///
/// Objects returned from `create_*` carry the control-plane assigned fields
/// (`uid`, `resourceVersion`) and are what later `replace_*` calls send back.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn create_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap>;

    async fn replace_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap>;

    async fn delete_config_map(&self, name: &str) -> ClusterResult<()>;

    async fn create_claim(&self, pvc: &PersistentVolumeClaim)
    -> ClusterResult<PersistentVolumeClaim>;

    async fn replace_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim>;

    async fn delete_claim(&self, name: &str) -> ClusterResult<()>;

    async fn create_job(&self, job: &Job) -> ClusterResult<Job>;
}

/// Hands out a cluster client for one submission.
#[async_trait]
pub trait ClusterConnector: Send + Sync + 'static {
    async fn connect(&self) -> ClusterResult<Arc<dyn ClusterApi>>;
}

/// Connector reusing one client established up front.
#[derive(Clone)]
pub struct SharedCluster(Arc<dyn ClusterApi>);

impl SharedCluster {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self(api)
    }
}

#[async_trait]
impl ClusterConnector for SharedCluster {
    async fn connect(&self) -> ClusterResult<Arc<dyn ClusterApi>> {
        Ok(Arc::clone(&self.0))
    }
}
