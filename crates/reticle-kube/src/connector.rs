use std::sync::Arc;

use async_trait::async_trait;
use reticle_core::{ClusterApi, ClusterConnector, ClusterResult};

use crate::gateway::KubeGateway;

/// Connects anew on every submission.
#[derive(Debug, Clone)]
pub struct KubeConnector {
    namespace: String,
}

impl KubeConnector {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self) -> ClusterResult<Arc<dyn ClusterApi>> {
        let gateway = KubeGateway::connect(self.namespace.as_str()).await?;
        Ok(Arc::new(gateway))
    }
}
