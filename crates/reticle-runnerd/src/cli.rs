use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Parser, builder::BoolishValueParser};
use reticle_core::config::{
    DEFAULT_CACHE_MOUNT, DEFAULT_CACHE_SIZE, DEFAULT_GPU_RESOURCE, DEFAULT_NAMESPACE,
    DEFAULT_ROLE_PREFIX,
};
use reticle_core::{AcceleratorPolicy, CachePolicy, CleanupPolicy, WorkloadConfig};
use reticle_observe::{LoggerConfig, LoggerFormat, LoggerLevel, LoggerResult, LoggerTimeZone};

/// Provisions assessor workloads on Kubernetes from HTTP submissions.
///
/// Every flag can also be set through the environment variable shown in `--help`.
#[derive(Debug, Parser)]
#[command(name = "reticle-runnerd", version)]
pub struct Cli {
    /// Address the HTTP API listens on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Namespace every resource is created in.
    #[arg(long, env = "NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Prefix of generated resource names.
    #[arg(long, env = "ROLE_PREFIX", default_value = DEFAULT_ROLE_PREFIX)]
    pub role_prefix: String,

    #[arg(long, env = "ASSESSOR_IMAGE", default_value = "")]
    pub assessor_image: String,

    /// Worker entrypoint override, split on whitespace. Image default when unset.
    #[arg(long, env = "ASSESSOR_COMMAND")]
    pub assessor_command: Option<String>,

    /// Image of the optional relay sidecar.
    #[arg(long, env = "RELAY_IMAGE")]
    pub relay_image: Option<String>,

    #[arg(long, env = "RELAY_COMMAND")]
    pub relay_command: Option<String>,

    #[arg(long, env = "NOTIFIER_URL", default_value = "")]
    pub notifier_url: String,

    #[arg(long, env = "LLM_SYSTEM_PROMPT", default_value = "")]
    pub llm_system_prompt: String,

    #[arg(long, env = "LLM_POSITIVE_RESPONSE_REGEX", default_value = "")]
    pub llm_positive_response_regex: String,

    /// Local file shipped to every worker next to the profile.
    #[arg(long, env = "ASSESSOR_CONFIG_PATH")]
    pub worker_config_path: Option<PathBuf>,

    /// Request an accelerator for every worker.
    #[arg(long, env = "GPU_ENABLED", value_parser = BoolishValueParser::new())]
    pub gpu_enabled: bool,

    #[arg(long, env = "GPU_RESOURCE", default_value = DEFAULT_GPU_RESOURCE)]
    pub gpu_resource: String,

    #[arg(long, env = "GPU_COUNT", default_value_t = 1)]
    pub gpu_count: u32,

    #[arg(long, env = "NODE_SELECTOR_KEY")]
    pub node_selector_key: Option<String>,

    #[arg(long, env = "NODE_SELECTOR_VALUE")]
    pub node_selector_value: Option<String>,

    /// Storage class of the per-submission cache claim; no claim when unset.
    #[arg(long, env = "CACHE_STORAGE_CLASS")]
    pub cache_storage_class: Option<String>,

    #[arg(long, env = "CACHE_SIZE", default_value = DEFAULT_CACHE_SIZE)]
    pub cache_size: String,

    #[arg(long, env = "CACHE_MOUNT_PATH", default_value = DEFAULT_CACHE_MOUNT)]
    pub cache_mount_path: String,

    #[arg(long, env = "BACKOFF_LIMIT")]
    pub backoff_limit: Option<i32>,

    #[arg(long, env = "SERVICE_ACCOUNT")]
    pub service_account: Option<String>,

    /// What to do with resources of a submission that failed before its Job existed.
    #[arg(long, env = "CLEANUP_POLICY", default_value = "leave")]
    pub cleanup: CleanupPolicy,

    /// Stop waiting for a submission after this many seconds.
    #[arg(long, env = "SUBMIT_TIMEOUT_SECS")]
    pub submit_timeout_secs: Option<u64>,

    /// Build a cluster client per submission instead of once at startup.
    #[arg(long, env = "LAZY_CONNECT", value_parser = BoolishValueParser::new())]
    pub lazy_connect: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    #[arg(long, env = "LOG_TZ", default_value = "utc")]
    pub log_tz: LoggerTimeZone,
}

fn command(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Empty environment values mean "not set".
fn non_empty<T: AsRef<std::ffi::OsStr> + Clone>(value: &Option<T>) -> Option<T> {
    value.as_ref().filter(|v| !v.as_ref().is_empty()).cloned()
}

impl Cli {
    pub fn workload_config(&self) -> WorkloadConfig {
        let accelerator = self.gpu_enabled.then(|| AcceleratorPolicy {
            resource: self.gpu_resource.clone(),
            count: self.gpu_count,
            node_selector_key: non_empty(&self.node_selector_key),
            node_selector_value: non_empty(&self.node_selector_value),
        });
        let cache = non_empty(&self.cache_storage_class).map(|storage_class| CachePolicy {
            storage_class,
            size: self.cache_size.clone(),
            mount_path: self.cache_mount_path.clone(),
        });

        WorkloadConfig {
            namespace: self.namespace.clone(),
            role_prefix: self.role_prefix.clone(),
            assessor_image: self.assessor_image.clone(),
            assessor_command: command(&self.assessor_command),
            relay_image: non_empty(&self.relay_image),
            relay_command: command(&self.relay_command),
            notifier_url: self.notifier_url.clone(),
            llm_system_prompt: self.llm_system_prompt.clone(),
            llm_positive_response_regex: self.llm_positive_response_regex.clone(),
            worker_config_path: non_empty(&self.worker_config_path),
            accelerator,
            cache,
            backoff_limit: self.backoff_limit,
            service_account: non_empty(&self.service_account),
        }
    }

    pub fn logger_config(&self) -> LoggerResult<LoggerConfig> {
        Ok(LoggerConfig {
            format: self.log_format,
            level: LoggerLevel::new(self.log_level.as_str())?,
            tz: self.log_tz,
            ..Default::default()
        })
    }

    pub fn submit_timeout(&self) -> Option<Duration> {
        self.submit_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Mutex, MutexGuard};

    /// Flags fall back to the process environment; tests touching it run one at a time.
    static ENV: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("reticle-runnerd").chain(args.iter().copied()))
    }

    fn parse(args: &[&str]) -> Cli {
        let _guard = env_lock();
        try_parse(args).unwrap()
    }

    /// Parse with `vars` set in the environment for the duration of the call.
    fn parse_with_env(vars: &[(&str, &str)]) -> Cli {
        let _guard = env_lock();
        for (k, v) in vars {
            // SAFETY: every reader of the environment in this module holds `ENV`.
            unsafe { std::env::set_var(k, v) };
        }
        let res = try_parse(&[]);
        for (k, _) in vars {
            // SAFETY: as above.
            unsafe { std::env::remove_var(k) };
        }
        res.unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn gpu_flag_enables_accelerator_policy() {
        let cli = parse(&[
            "--gpu-enabled",
            "--node-selector-key",
            "cloud.google.com/gke-accelerator",
            "--node-selector-value",
            "nvidia-l4",
        ]);
        let acc = cli.workload_config().accelerator.unwrap();

        assert_eq!(acc.resource, "nvidia.com/gpu");
        assert_eq!(acc.count, 1);
        assert_eq!(
            acc.node_selector(),
            Some(("cloud.google.com/gke-accelerator", "nvidia-l4"))
        );
    }

    #[test]
    fn node_selector_without_gpu_is_ignored() {
        let cli = parse(&["--node-selector-key", "pool", "--node-selector-value", "gpu"]);
        assert!(cli.workload_config().accelerator.is_none());
    }

    #[test]
    fn storage_class_enables_cache() {
        let cache = parse(&["--cache-storage-class", "fast-ssd", "--cache-size", "20Gi"])
            .workload_config()
            .cache
            .unwrap();

        assert_eq!(cache.storage_class, "fast-ssd");
        assert_eq!(cache.size, "20Gi");
        assert_eq!(cache.mount_path, DEFAULT_CACHE_MOUNT);
    }

    #[test]
    fn empty_optional_values_count_as_unset() {
        let config = parse(&["--relay-image", "", "--cache-storage-class", ""]).workload_config();
        assert!(config.relay_image.is_none());
        assert!(config.cache.is_none());
    }

    #[test]
    fn cleanup_and_timeout_are_parsed() {
        let cli = parse(&["--cleanup", "best-effort", "--submit-timeout-secs", "30"]);
        assert_eq!(cli.cleanup, CleanupPolicy::BestEffort);
        assert_eq!(cli.submit_timeout(), Some(Duration::from_secs(30)));
        assert!(parse(&[]).submit_timeout().is_none());
    }

    #[test]
    fn boolean_env_accepts_numeric_values() {
        let cli = parse_with_env(&[("GPU_ENABLED", "1"), ("LAZY_CONNECT", "1")]);
        assert!(cli.gpu_enabled);
        assert!(cli.lazy_connect);
        assert!(cli.workload_config().accelerator.is_some());

        let cli = parse_with_env(&[("GPU_ENABLED", "0"), ("LAZY_CONNECT", "no")]);
        assert!(!cli.gpu_enabled);
        assert!(!cli.lazy_connect);
    }

    #[test]
    fn commands_are_split_on_whitespace() {
        let config = parse(&[
            "--assessor-command",
            "/opt/reticle/assessor --verbose",
            "--relay-command",
            "/opt/reticle/relay",
        ])
        .workload_config();

        assert_eq!(config.assessor_command, vec!["/opt/reticle/assessor", "--verbose"]);
        assert_eq!(config.relay_command, vec!["/opt/reticle/relay"]);
        assert!(parse(&[]).workload_config().assessor_command.is_empty());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let cli = parse(&["--log-level", "reticle=notalevel"]);
        assert!(cli.logger_config().is_err());
    }
}
