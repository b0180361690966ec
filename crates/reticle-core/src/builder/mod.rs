//! Describes the resources of one submission without touching the cluster.
//!
//! The only side effect is reading the optional worker configuration file.
mod pod;

use std::{collections::BTreeMap, fs, sync::Arc};

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodTemplateSpec,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use reticle_model::{LABEL_APP_NAME, LABEL_COMPONENT, LABEL_SUBMISSION, Labels, Profile, ResourceName};
use tracing::{debug, instrument};

use crate::{
    config::{CachePolicy, WorkloadConfig},
    error::BuildError,
    naming::{NameGenerator, UuidNames},
};

/// Application label value on every object.
pub const APP_NAME: &str = "reticle";
/// ConfigMap key holding the encoded profile.
pub const PROFILE_FILE: &str = "data.json";
/// Directory the ConfigMap is mounted at inside the worker.
pub const PROFILE_MOUNT_DIR: &str = "/etc/shortlist/profile";

pub const ENV_PROFILE_PATH: &str = "PROFILE_PATH";
pub const ENV_NOTIFIER_URL: &str = "NOTIFIER_URL";
pub const ENV_LLM_SYSTEM_PROMPT: &str = "LLM_SYSTEM_PROMPT";
pub const ENV_LLM_POSITIVE_RESPONSE_REGEX: &str = "LLM_POSITIVE_RESPONSE_REGEX";
pub const ENV_WORKER_CONFIG_PATH: &str = "WORKER_CONFIG_PATH";
pub const ENV_CACHE_DIR: &str = "CACHE_DIR";

/// Resources of one submission, all named after [`ResourceSet::name`].
#[derive(Debug, Clone)]
pub struct ResourceSet {
    pub name: ResourceName,
    pub artifact_store: ConfigMap,
    pub cache_claim: Option<PersistentVolumeClaim>,
    pub execution_unit: Job,
}

/// Turns profiles into [`ResourceSet`]s under a fixed [`WorkloadConfig`].
#[derive(Clone)]
pub struct ResourceBuilder {
    config: Arc<WorkloadConfig>,
    names: Arc<dyn NameGenerator>,
}

impl ResourceBuilder {
    /// Builder naming resources `"<role_prefix>-<uuid>"`.
    pub fn new(config: Arc<WorkloadConfig>) -> Self {
        let names = Arc::new(UuidNames::new(config.role_prefix.clone()));
        Self { config, names }
    }

    /// Replace the name source.
    pub fn with_names(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = names;
        self
    }

    /// Describe the ConfigMap, optional claim and Job for `profile`.
    #[instrument(level = "debug", skip_all)]
    pub fn build(&self, profile: &Profile) -> Result<ResourceSet, BuildError> {
        let name = self.names.next_name()?;
        let labels = self.labels(&name);

        let worker_config = self.read_worker_config()?;
        let worker_config_key = worker_config.as_ref().map(|(key, _)| key.clone());

        let artifact_store = self.artifact_store(&name, &labels, profile, worker_config)?;
        let cache_claim = self
            .config
            .cache
            .as_ref()
            .map(|cache| self.cache_claim(&name, &labels, cache));
        let execution_unit = self.execution_unit(
            &name,
            &labels,
            worker_config_key.as_deref(),
            cache_claim.is_some(),
        );

        debug!(%name, cache = cache_claim.is_some(), "resource set built");
        Ok(ResourceSet {
            name,
            artifact_store,
            cache_claim,
            execution_unit,
        })
    }

    fn labels(&self, name: &ResourceName) -> Labels {
        let mut labels = Labels::new();
        labels
            .insert(LABEL_APP_NAME, APP_NAME)
            .insert(LABEL_SUBMISSION, name.as_str());
        let role = self.config.role();
        if !role.is_empty() {
            labels.insert(LABEL_COMPONENT, role);
        }
        labels
    }

    fn metadata(&self, name: &ResourceName, labels: &Labels) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.config.namespace.clone()),
            labels: Some(labels.to_map()),
            ..Default::default()
        }
    }

    /// Returns `(configmap key, contents)` of the worker config file, if configured.
    fn read_worker_config(&self) -> Result<Option<(String, String)>, BuildError> {
        let Some(path) = &self.config.worker_config_path else {
            return Ok(None);
        };
        let contents = fs::read_to_string(path).map_err(|source| BuildError::WorkerConfig {
            path: path.clone(),
            source,
        })?;
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("worker-config")
            .to_string();
        Ok(Some((key, contents)))
    }

    fn artifact_store(
        &self,
        name: &ResourceName,
        labels: &Labels,
        profile: &Profile,
        worker_config: Option<(String, String)>,
    ) -> Result<ConfigMap, BuildError> {
        let mut data = BTreeMap::new();
        data.insert(PROFILE_FILE.to_string(), profile.to_json()?);
        if let Some((key, contents)) = worker_config {
            data.insert(key, contents);
        }

        Ok(ConfigMap {
            metadata: self.metadata(name, labels),
            data: Some(data),
            ..Default::default()
        })
    }

    fn cache_claim(
        &self,
        name: &ResourceName,
        labels: &Labels,
        cache: &CachePolicy,
    ) -> PersistentVolumeClaim {
        let requests = BTreeMap::from([("storage".to_string(), Quantity(cache.size.clone()))]);

        PersistentVolumeClaim {
            metadata: self.metadata(name, labels),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                storage_class_name: Some(cache.storage_class.clone()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(requests),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn execution_unit(
        &self,
        name: &ResourceName,
        labels: &Labels,
        worker_config_key: Option<&str>,
        with_cache: bool,
    ) -> Job {
        let pod = pod::PodParts {
            config: self.config.as_ref(),
            name,
            worker_config_key,
            with_cache,
        };

        Job {
            metadata: self.metadata(name, labels),
            spec: Some(JobSpec {
                backoff_limit: self.config.backoff_limit,
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels.to_map()),
                        ..Default::default()
                    }),
                    spec: Some(pod.pod_spec()),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
