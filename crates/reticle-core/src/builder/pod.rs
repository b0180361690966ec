//! Pod template pieces of the execution unit.
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EnvVar, PersistentVolumeClaimVolumeSource, PodSpec,
    ResourceRequirements, Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use reticle_model::{Env, ResourceName};

use super::{
    ENV_CACHE_DIR, ENV_LLM_POSITIVE_RESPONSE_REGEX, ENV_LLM_SYSTEM_PROMPT, ENV_NOTIFIER_URL,
    ENV_PROFILE_PATH, ENV_WORKER_CONFIG_PATH, PROFILE_FILE, PROFILE_MOUNT_DIR,
};
use crate::config::{AcceleratorPolicy, WorkloadConfig};

pub(crate) const ASSESSOR_CONTAINER: &str = "assessor";
pub(crate) const RELAY_CONTAINER: &str = "relay";

const PROFILE_VOLUME: &str = "profile";
const CACHE_VOLUME: &str = "cache";

/// Inputs for one pod template.
pub(super) struct PodParts<'a> {
    pub config: &'a WorkloadConfig,
    pub name: &'a ResourceName,
    pub worker_config_key: Option<&'a str>,
    pub with_cache: bool,
}

impl PodParts<'_> {
    pub fn pod_spec(&self) -> PodSpec {
        let accelerator = self.config.accelerator.as_ref();

        let mut containers = vec![self.assessor()];
        if let Some(relay) = self.relay() {
            containers.push(relay);
        }

        PodSpec {
            containers,
            volumes: Some(self.volumes()),
            restart_policy: Some("Never".to_string()),
            service_account_name: self.config.service_account.clone(),
            node_selector: accelerator.and_then(node_selector),
            tolerations: accelerator.map(tolerations),
            ..Default::default()
        }
    }

    fn assessor(&self) -> Container {
        Container {
            name: ASSESSOR_CONTAINER.to_string(),
            image: Some(self.config.assessor_image.clone()),
            command: command(&self.config.assessor_command),
            env: Some(env_vars(self.assessor_env())),
            volume_mounts: Some(self.assessor_mounts()),
            resources: self.config.accelerator.as_ref().map(accelerator_resources),
            ..Default::default()
        }
    }

    fn relay(&self) -> Option<Container> {
        let image = self.config.relay_image.as_ref()?;
        let env = Env::new().with(ENV_NOTIFIER_URL, self.config.notifier_url.as_str());

        Some(Container {
            name: RELAY_CONTAINER.to_string(),
            image: Some(image.clone()),
            command: command(&self.config.relay_command),
            env: Some(env_vars(env)),
            ..Default::default()
        })
    }

    fn assessor_env(&self) -> Env {
        let cfg = self.config;
        let mut env = Env::new()
            .with(ENV_PROFILE_PATH, format!("{PROFILE_MOUNT_DIR}/{PROFILE_FILE}"))
            .with(ENV_NOTIFIER_URL, cfg.notifier_url.as_str())
            .with(ENV_LLM_SYSTEM_PROMPT, cfg.llm_system_prompt.as_str())
            .with(ENV_LLM_POSITIVE_RESPONSE_REGEX, cfg.llm_positive_response_regex.as_str());

        if let Some(key) = self.worker_config_key {
            env.set(ENV_WORKER_CONFIG_PATH, format!("{PROFILE_MOUNT_DIR}/{key}"));
        }
        if let Some(cache) = cfg.cache.as_ref().filter(|_| self.with_cache) {
            env.set(ENV_CACHE_DIR, cache.mount_path.as_str());
        }
        env
    }

    fn assessor_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = vec![VolumeMount {
            name: PROFILE_VOLUME.to_string(),
            mount_path: PROFILE_MOUNT_DIR.to_string(),
            read_only: Some(true),
            ..Default::default()
        }];

        if let Some(cache) = self.config.cache.as_ref().filter(|_| self.with_cache) {
            mounts.push(VolumeMount {
                name: CACHE_VOLUME.to_string(),
                mount_path: cache.mount_path.clone(),
                ..Default::default()
            });
        }
        mounts
    }

    fn volumes(&self) -> Vec<Volume> {
        let mut volumes = vec![Volume {
            name: PROFILE_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: self.name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }];

        if self.with_cache {
            volumes.push(Volume {
                name: CACHE_VOLUME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: self.name.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            });
        }
        volumes
    }
}

/// `None` leaves the image entrypoint in place.
fn command(cmd: &[String]) -> Option<Vec<String>> {
    (!cmd.is_empty()).then(|| cmd.to_vec())
}

fn env_vars(env: Env) -> Vec<EnvVar> {
    env.into_iter()
        .map(|kv| {
            let (name, value) = kv.into_parts();
            EnvVar {
                name,
                value: Some(value),
                ..Default::default()
            }
        })
        .collect()
}

/// Request and limit are equal; extended resources cannot be overcommitted.
fn accelerator_resources(acc: &AcceleratorPolicy) -> ResourceRequirements {
    let amount = BTreeMap::from([(acc.resource.clone(), Quantity(acc.count.to_string()))]);
    ResourceRequirements {
        requests: Some(amount.clone()),
        limits: Some(amount),
        ..Default::default()
    }
}

fn node_selector(acc: &AcceleratorPolicy) -> Option<BTreeMap<String, String>> {
    acc.node_selector()
        .map(|(k, v)| BTreeMap::from([(k.to_string(), v.to_string())]))
}

fn tolerations(acc: &AcceleratorPolicy) -> Vec<Toleration> {
    vec![Toleration {
        key: Some(acc.resource.clone()),
        operator: Some("Exists".to_string()),
        effect: Some("NoSchedule".to_string()),
        ..Default::default()
    }]
}
