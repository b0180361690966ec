use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Config, Resource, ResourceExt};
use reticle_core::{ClusterApi, ClusterError, ClusterResult};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument};

use crate::error::{is_not_found, to_cluster_error};

/// [`ClusterApi`] over a shared `kube::Client`, scoped to one namespace.
///
/// The client is cheap to clone and safe to use from concurrent submissions.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    namespace: String,
}

impl KubeGateway {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// In-cluster service account first, kubeconfig inference otherwise. Never retried.
    #[instrument(level = "debug", skip_all)]
    pub async fn connect(namespace: impl Into<String>) -> ClusterResult<Self> {
        let config = match Config::incluster() {
            Ok(config) => config,
            Err(e) => {
                debug!(error = %e, "not running in a cluster, inferring config");
                Config::infer()
                    .await
                    .map_err(|e| ClusterError::Connect(format!("failed to infer config: {e}")))?
            }
        };
        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Connect(format!("failed to create client: {e}")))?;

        let gateway = Self::new(client, namespace);
        info!(namespace = %gateway.namespace, "cluster client ready");
        Ok(gateway)
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn create<K>(&self, obj: &K) -> ClusterResult<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        K::DynamicType: Default,
    {
        let created = self
            .api::<K>()
            .create(&PostParams::default(), obj)
            .await
            .map_err(to_cluster_error)?;
        debug!(kind = %K::kind(&Default::default()), name = %created.name_any(), "created");
        Ok(created)
    }

    async fn replace<K>(&self, obj: &K) -> ClusterResult<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        K::DynamicType: Default,
    {
        let name = obj
            .meta()
            .name
            .as_deref()
            .ok_or_else(|| ClusterError::Invalid("replace needs a named object".into()))?;
        self.api::<K>()
            .replace(name, &PostParams::default(), obj)
            .await
            .map_err(to_cluster_error)
    }

    async fn delete<K>(&self, name: &str) -> ClusterResult<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        K::DynamicType: Default,
    {
        match self.api::<K>().delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(name, "already gone");
                Ok(())
            }
            Err(e) => Err(to_cluster_error(e)),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeGateway {
    async fn create_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap> {
        self.create(cm).await
    }

    async fn replace_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap> {
        self.replace(cm).await
    }

    async fn delete_config_map(&self, name: &str) -> ClusterResult<()> {
        self.delete::<ConfigMap>(name).await
    }

    async fn create_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        self.create(pvc).await
    }

    async fn replace_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        self.replace(pvc).await
    }

    async fn delete_claim(&self, name: &str) -> ClusterResult<()> {
        self.delete::<PersistentVolumeClaim>(name).await
    }

    async fn create_job(&self, job: &Job) -> ClusterResult<Job> {
        self.create(job).await
    }
}
