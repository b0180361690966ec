use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reticle_core::{Provisioner, SubmissionResult};
use reticle_model::{ExecutionUnitId, Profile};
use tracing::error;

use crate::{error::ApiError, handler::ApiHandler};

/// Bridges [`Provisioner`] to [`ApiHandler`].
pub struct ProvisionerAdapter {
    provisioner: Arc<Provisioner>,
    timeout: Option<Duration>,
}

impl ProvisionerAdapter {
    pub fn new(provisioner: Arc<Provisioner>) -> Self {
        Self {
            provisioner,
            timeout: None,
        }
    }

    /// Stop waiting after `timeout`. The submission keeps running in the background;
    /// control-plane calls already issued are not cancelled.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, profile: Profile) -> Result<SubmissionResult, ApiError> {
        let Some(timeout) = self.timeout else {
            return Ok(self.provisioner.submit(&profile).await.into());
        };

        let provisioner = Arc::clone(&self.provisioner);
        let task = tokio::spawn(async move { provisioner.submit(&profile).await });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(res)) => Ok(res.into()),
            Ok(Err(e)) => Err(ApiError::Internal(format!("submission task failed: {e}"))),
            Err(_) => {
                error!(?timeout, "submission deadline expired, abandoning");
                Err(ApiError::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl ApiHandler for ProvisionerAdapter {
    async fn submit_profile(&self, profile: Profile) -> Result<ExecutionUnitId, ApiError> {
        match self.run(profile).await? {
            SubmissionResult::Created(id) => Ok(id),
            SubmissionResult::Failed { stage, message } => {
                Err(ApiError::Provisioning { stage, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reticle_core::{
        ClusterApi, ClusterConnector, ClusterResult, ResourceBuilder, SharedCluster, Stage,
        WorkloadConfig,
        testing::{Op, RecordingCluster},
    };

    fn provisioner(connector: Arc<dyn ClusterConnector>) -> Arc<Provisioner> {
        let builder = ResourceBuilder::new(Arc::new(WorkloadConfig::default()));
        Arc::new(Provisioner::new(builder, connector))
    }

    /// Connector that never answers.
    struct Hanging;

    #[async_trait]
    impl ClusterConnector for Hanging {
        async fn connect(&self) -> ClusterResult<Arc<dyn ClusterApi>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn created_result_yields_id() {
        let cluster = RecordingCluster::new().shared();
        let adapter = ProvisionerAdapter::new(provisioner(Arc::new(SharedCluster::new(cluster))));

        let id = adapter.submit_profile(Profile::new("foo")).await.unwrap();
        assert!(id.as_str().starts_with("assessor-"));
    }

    #[tokio::test]
    async fn failed_result_keeps_stage() {
        let cluster = RecordingCluster::new().failing_on(Op::CreateJob).shared();
        let adapter = ProvisionerAdapter::new(provisioner(Arc::new(SharedCluster::new(cluster))))
            .with_timeout(Duration::from_secs(5));

        match adapter.submit_profile(Profile::new("foo")).await {
            Err(ApiError::Provisioning { stage, .. }) => assert_eq!(stage, Stage::ExecutionUnit),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_abandons_the_submission() {
        let adapter = ProvisionerAdapter::new(provisioner(Arc::new(Hanging)))
            .with_timeout(Duration::from_millis(20));

        let err = adapter.submit_profile(Profile::new("foo")).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }
}
