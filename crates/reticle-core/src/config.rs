//! Process-wide workload configuration.
//!
//! Built once at startup and shared read-only by every submission.
use std::{fmt, path::PathBuf, str::FromStr};

use reticle_model::ResourceName;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builder::PROFILE_FILE;
use crate::error::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "shortlist";
pub const DEFAULT_ROLE_PREFIX: &str = "assessor";
pub const DEFAULT_GPU_RESOURCE: &str = "nvidia.com/gpu";
pub const DEFAULT_CACHE_SIZE: &str = "10Gi";
pub const DEFAULT_CACHE_MOUNT: &str = "/var/cache/assessor";

/// Everything the builder needs besides the request itself.
///
/// String values are passed to the worker as-is; empty strings are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Namespace all resources are created in.
    pub namespace: String,
    /// Prefix of every generated resource name; empty yields bare UUIDs.
    pub role_prefix: String,
    /// Worker container image.
    pub assessor_image: String,
    /// Worker entrypoint; the image default when empty.
    pub assessor_command: Vec<String>,
    /// Optional second container forwarding worker results.
    pub relay_image: Option<String>,
    pub relay_command: Vec<String>,
    /// Endpoint the worker reports outcomes to.
    pub notifier_url: String,
    pub llm_system_prompt: String,
    pub llm_positive_response_regex: String,
    /// Static worker configuration file shipped next to the profile.
    pub worker_config_path: Option<PathBuf>,
    /// Accelerator placement applied to every submission.
    pub accelerator: Option<AcceleratorPolicy>,
    /// Durable cache claim created for every submission.
    pub cache: Option<CachePolicy>,
    /// Job-level retry budget; omitted when `None`.
    pub backoff_limit: Option<i32>,
    pub service_account: Option<String>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
            assessor_image: String::new(),
            assessor_command: Vec::new(),
            relay_image: None,
            relay_command: Vec::new(),
            notifier_url: String::new(),
            llm_system_prompt: String::new(),
            llm_positive_response_regex: String::new(),
            worker_config_path: None,
            accelerator: None,
            cache: None,
            backoff_limit: None,
            service_account: None,
        }
    }
}

impl WorkloadConfig {
    /// Reject shapes that would make every submission fail at the control plane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ResourceName::new(self.namespace.as_str()).is_err() {
            return Err(ConfigError::Namespace(self.namespace.clone()));
        }
        // Generated names are the prefix, a dash and 36 uuid characters.
        if ResourceName::from_uuid(&self.role_prefix, Uuid::nil()).is_err() {
            return Err(ConfigError::RolePrefix(self.role_prefix.clone()));
        }
        if let Some(acc) = &self.accelerator {
            acc.validate()?;
        }
        if let Some(cache) = &self.cache {
            cache.validate()?;
        }
        if let Some(path) = &self.worker_config_path {
            match path.file_name().and_then(|n| n.to_str()) {
                None => return Err(ConfigError::WorkerConfigPath("has no file name")),
                Some(PROFILE_FILE) => {
                    return Err(ConfigError::WorkerConfigPath("collides with the profile file"));
                }
                Some(name) if !is_config_map_key(name) => {
                    return Err(ConfigError::WorkerConfigPath(
                        "file name is not a valid configmap key ([-._a-zA-Z0-9]+)",
                    ));
                }
                Some(_) => {}
            }
        }
        if let Some(limit) = self.backoff_limit {
            if limit < 0 {
                return Err(ConfigError::BackoffLimit(limit));
            }
        }
        Ok(())
    }

    /// Role prefix as it appears in names and labels: trimmed and lowercased.
    pub fn role(&self) -> String {
        self.role_prefix.trim().to_ascii_lowercase()
    }
}

/// ConfigMap data keys: `[-._a-zA-Z0-9]+`, at most 253 characters.
fn is_config_map_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 253
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Accelerator request, node selector and taint toleration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorPolicy {
    /// Extended resource name, also used as the tolerated taint key.
    pub resource: String,
    /// Units requested and limited per pod.
    pub count: u32,
    pub node_selector_key: Option<String>,
    pub node_selector_value: Option<String>,
}

impl Default for AcceleratorPolicy {
    fn default() -> Self {
        Self {
            resource: DEFAULT_GPU_RESOURCE.to_string(),
            count: 1,
            node_selector_key: None,
            node_selector_value: None,
        }
    }
}

impl AcceleratorPolicy {
    /// Node selector pair, if both halves are set.
    pub fn node_selector(&self) -> Option<(&str, &str)> {
        match (&self.node_selector_key, &self.node_selector_value) {
            (Some(k), Some(v)) => Some((k.as_str(), v.as_str())),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.resource.trim().is_empty() {
            return Err(ConfigError::Accelerator("resource name is empty"));
        }
        if self.count == 0 {
            return Err(ConfigError::Accelerator("count must be positive"));
        }
        let key = self.node_selector_key.as_deref().is_some_and(|k| !k.is_empty());
        let value = self.node_selector_value.as_deref().is_some_and(|v| !v.is_empty());
        if key != value {
            return Err(ConfigError::HalfNodeSelector);
        }
        Ok(())
    }
}

/// Durable cache volume claimed per submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Pre-provisioned storage class the claim binds to.
    pub storage_class: String,
    /// Requested size as a Kubernetes quantity.
    pub size: String,
    /// Mount path inside the worker container.
    pub mount_path: String,
}

impl CachePolicy {
    pub fn new(storage_class: impl Into<String>) -> Self {
        Self {
            storage_class: storage_class.into(),
            size: DEFAULT_CACHE_SIZE.to_string(),
            mount_path: DEFAULT_CACHE_MOUNT.to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_class.trim().is_empty() {
            return Err(ConfigError::Cache("storage class is empty"));
        }
        if self.size.trim().is_empty() {
            return Err(ConfigError::Cache("size is empty"));
        }
        if !self.mount_path.starts_with('/') {
            return Err(ConfigError::Cache("mount path must be absolute"));
        }
        Ok(())
    }
}

/// What happens to already created resources when a later creation step fails.
///
/// Never affects owner-link failures: an accepted Job is left running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Leave orphans in place.
    #[default]
    Leave,
    /// Try to delete the ConfigMap (and claim); delete errors are only logged.
    BestEffort,
}

impl FromStr for CleanupPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leave" | "none" => Ok(CleanupPolicy::Leave),
            "best-effort" | "besteffort" => Ok(CleanupPolicy::BestEffort),
            other => Err(format!("unknown cleanup policy: {other} (expected: leave|best-effort)")),
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CleanupPolicy::Leave => "leave",
            CleanupPolicy::BestEffort => "best-effort",
        })
    }
}
