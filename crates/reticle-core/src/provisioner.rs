//! Submits a [`ResourceSet`] in dependency order and links it to the Job afterwards.
use std::{sync::Arc, time::Instant};

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use reticle_model::{ExecutionUnitId, Profile, ResourceName};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    builder::{ResourceBuilder, ResourceSet},
    cluster::{ClusterApi, ClusterConnector, ClusterError, ClusterResult},
    config::CleanupPolicy,
    error::ProvisionError,
    metrics::{MetricsHandle, SubmissionOutcome, noop_metrics},
    result::Stage,
};

/// Builds and provisions one submission per [`Provisioner::submit`] call.
///
/// Steps run strictly in order and are never retried:
/// 1. ConfigMap, 2. PVC (if built), 3. Job, 4. owner reference on the ConfigMap,
/// 5. owner reference on the PVC.
///
/// Owner-link failures are reported but the already accepted Job is left running.
pub struct Provisioner {
    builder: ResourceBuilder,
    connector: Arc<dyn ClusterConnector>,
    cleanup: CleanupPolicy,
    metrics: MetricsHandle,
}

impl Provisioner {
    pub fn new(builder: ResourceBuilder, connector: Arc<dyn ClusterConnector>) -> Self {
        Self {
            builder,
            connector,
            cleanup: CleanupPolicy::default(),
            metrics: noop_metrics(),
        }
    }

    /// What to do with resources left behind when step 2 or 3 fails.
    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build, connect and provision; returns the Job name reported by the control plane.
    pub async fn submit(&self, profile: &Profile) -> Result<ExecutionUnitId, ProvisionError> {
        let started = Instant::now();
        let res = self.provision(profile).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &res {
            Ok(id) => {
                self.metrics
                    .record_submission(SubmissionOutcome::Created, elapsed_ms);
                info!(%id, elapsed_ms, "submission created");
            }
            Err(e) => {
                self.metrics
                    .record_submission(SubmissionOutcome::Failed, elapsed_ms);
                self.metrics.record_stage_failure(e.stage());
                let job_accepted = e.stage().after_execution_unit();
                error!(stage = %e.stage(), job_accepted, error = %e, elapsed_ms, "submission failed");
            }
        }
        res
    }

    async fn provision(&self, profile: &Profile) -> Result<ExecutionUnitId, ProvisionError> {
        let set = self.builder.build(profile)?;
        let cluster = self
            .connector
            .connect()
            .await
            .map_err(ProvisionError::Connect)?;
        self.apply(cluster.as_ref(), set).await
    }

    /// Run the five cluster steps for an already built set.
    #[instrument(level = "debug", skip_all, fields(name = %set.name))]
    pub async fn apply(
        &self,
        cluster: &dyn ClusterApi,
        set: ResourceSet,
    ) -> Result<ExecutionUnitId, ProvisionError> {
        let ResourceSet {
            name,
            artifact_store,
            cache_claim,
            execution_unit,
        } = set;

        let mut artifact_store = cluster
            .create_config_map(&artifact_store)
            .await
            .map_err(|e| ProvisionError::step(Stage::ArtifactStore, &name, e))?;
        debug!("artifact store created");

        let mut cache_claim = match cache_claim {
            Some(claim) => match cluster.create_claim(&claim).await {
                Ok(created) => {
                    debug!("cache claim created");
                    Some(created)
                }
                Err(e) => {
                    self.cleanup_orphans(cluster, &name, false).await;
                    return Err(ProvisionError::step(Stage::CacheClaim, &name, e));
                }
            },
            None => None,
        };

        let created = cluster.create_job(&execution_unit).await;
        let (owner, id) = match created.and_then(|job| owner_of(&job)) {
            Ok(owner) => owner,
            Err(e) => {
                self.cleanup_orphans(cluster, &name, cache_claim.is_some())
                    .await;
                return Err(ProvisionError::step(Stage::ExecutionUnit, &name, e));
            }
        };
        debug!(job = %id, uid = %owner.uid, "execution unit created");

        attach_owner(&mut artifact_store.metadata, &owner);
        cluster
            .replace_config_map(&artifact_store)
            .await
            .map_err(|e| ProvisionError::step(Stage::OwnerLinkArtifact, &name, e))?;

        if let Some(claim) = cache_claim.as_mut() {
            attach_owner(&mut claim.metadata, &owner);
            cluster
                .replace_claim(claim)
                .await
                .map_err(|e| ProvisionError::step(Stage::OwnerLinkCache, &name, e))?;
        }
        debug!("owner references attached");

        Ok(id)
    }

    async fn cleanup_orphans(&self, cluster: &dyn ClusterApi, name: &ResourceName, claim: bool) {
        if self.cleanup == CleanupPolicy::Leave {
            warn!(%name, "leaving resources of failed submission in place");
            return;
        }
        if claim {
            if let Err(e) = cluster.delete_claim(name.as_str()).await {
                warn!(%name, error = %e, "failed to delete orphaned cache claim");
            }
        }
        if let Err(e) = cluster.delete_config_map(name.as_str()).await {
            warn!(%name, error = %e, "failed to delete orphaned artifact store");
        }
    }
}

/// Owner reference pointing at `job`, plus the name it was created under.
fn owner_of(job: &Job) -> ClusterResult<(OwnerReference, ExecutionUnitId)> {
    let name = job
        .metadata
        .name
        .clone()
        .ok_or_else(|| ClusterError::Invalid("created job has no name".into()))?;
    let uid = job
        .metadata
        .uid
        .clone()
        .ok_or_else(|| ClusterError::Invalid(format!("created job '{name}' has no uid")))?;

    let owner = OwnerReference {
        api_version: "batch/v1".into(),
        kind: "Job".into(),
        name: name.clone(),
        uid,
        ..Default::default()
    };
    Ok((owner, ExecutionUnitId::from(name)))
}

fn attach_owner(meta: &mut ObjectMeta, owner: &OwnerReference) {
    meta.owner_references
        .get_or_insert_with(Vec::new)
        .push(owner.clone());
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        cluster::SharedCluster,
        config::{CachePolicy, WorkloadConfig},
        metrics::MetricsBackend,
        naming::FixedNames,
        testing::{Op, RecordingCluster, UnreachableCluster},
    };

    const NAME: &str = "assessor-6f1c2d4e-0b7a-4c1e-9d53-2a8f7e6b1c90";

    fn config(cache: bool) -> WorkloadConfig {
        WorkloadConfig {
            assessor_image: "ghcr.io/acme/assessor:1.0".into(),
            cache: cache.then(|| CachePolicy::new("fast-ssd")),
            ..Default::default()
        }
    }

    fn fixed_builder(cache: bool) -> ResourceBuilder {
        ResourceBuilder::new(Arc::new(config(cache)))
            .with_names(Arc::new(FixedNames::new(ResourceName::new(NAME).unwrap())))
    }

    fn provisioner(cluster: &Arc<RecordingCluster>, cache: bool) -> Provisioner {
        Provisioner::new(
            fixed_builder(cache),
            Arc::new(SharedCluster::new(cluster.clone())),
        )
    }

    async fn stage_of(p: &Provisioner) -> Stage {
        p.submit(&Profile::new("foo")).await.unwrap_err().stage()
    }

    #[derive(Default)]
    struct CountingMetrics {
        outcomes: Mutex<Vec<SubmissionOutcome>>,
        stages: Mutex<Vec<Stage>>,
    }

    impl MetricsBackend for CountingMetrics {
        fn record_submission(&self, outcome: SubmissionOutcome, _: u64) {
            self.outcomes.lock().unwrap().push(outcome);
        }

        fn record_stage_failure(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[tokio::test]
    async fn creates_then_links_without_cache() {
        let cluster = RecordingCluster::new().shared();
        let id = provisioner(&cluster, false)
            .submit(&Profile::new("foo"))
            .await
            .unwrap();

        assert_eq!(id.as_str(), NAME);
        assert_eq!(
            cluster.ops(),
            vec![Op::CreateConfigMap, Op::CreateJob, Op::ReplaceConfigMap]
        );
        assert!(cluster.calls().iter().all(|c| c.name == NAME));
    }

    #[tokio::test]
    async fn creates_then_links_with_cache() {
        let cluster = RecordingCluster::new().shared();
        provisioner(&cluster, true)
            .submit(&Profile::new("foo"))
            .await
            .unwrap();

        assert_eq!(
            cluster.ops(),
            vec![
                Op::CreateConfigMap,
                Op::CreateClaim,
                Op::CreateJob,
                Op::ReplaceConfigMap,
                Op::ReplaceClaim,
            ]
        );
    }

    #[tokio::test]
    async fn owner_reference_carries_job_uid() {
        let cluster = RecordingCluster::new().shared();
        provisioner(&cluster, true)
            .submit(&Profile::new("foo"))
            .await
            .unwrap();

        // uid-1 ConfigMap, uid-2 claim, uid-3 Job.
        let cm = &cluster.replaced_config_maps()[0];
        let refs = cm.metadata.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].api_version, "batch/v1");
        assert_eq!(refs[0].kind, "Job");
        assert_eq!(refs[0].name, NAME);
        assert_eq!(refs[0].uid, "uid-3");
        // Replace sends back the created object, resourceVersion included.
        assert_eq!(cm.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(cm.metadata.uid.as_deref(), Some("uid-1"));

        let claim = &cluster.replaced_claims()[0];
        assert_eq!(
            claim.metadata.owner_references.as_ref().unwrap()[0].uid,
            "uid-3"
        );
    }

    #[tokio::test]
    async fn returns_job_name_reported_by_cluster() {
        let cluster = RecordingCluster::new()
            .reporting_job_name("assessor-server-side")
            .shared();
        let id = provisioner(&cluster, false)
            .submit(&Profile::new("foo"))
            .await
            .unwrap();

        assert_eq!(id.as_str(), "assessor-server-side");
        let refs = cluster.replaced_config_maps()[0]
            .metadata
            .owner_references
            .clone()
            .unwrap();
        assert_eq!(refs[0].name, "assessor-server-side");
    }

    #[tokio::test]
    async fn each_step_reports_its_stage() {
        let cases = [
            (Op::CreateConfigMap, Stage::ArtifactStore),
            (Op::CreateClaim, Stage::CacheClaim),
            (Op::CreateJob, Stage::ExecutionUnit),
            (Op::ReplaceConfigMap, Stage::OwnerLinkArtifact),
            (Op::ReplaceClaim, Stage::OwnerLinkCache),
        ];
        for (op, stage) in cases {
            let cluster = RecordingCluster::new().failing_on(op).shared();
            assert_eq!(stage_of(&provisioner(&cluster, true)).await, stage, "{op:?}");
        }
    }

    #[tokio::test]
    async fn failure_stops_the_sequence() {
        let cluster = RecordingCluster::new().failing_on(Op::CreateClaim).shared();
        stage_of(&provisioner(&cluster, true)).await;

        assert_eq!(cluster.ops(), vec![Op::CreateConfigMap, Op::CreateClaim]);
    }

    #[tokio::test]
    async fn job_without_uid_is_an_execution_unit_failure() {
        let cluster = RecordingCluster::new().omitting_job_uid().shared();
        let err = provisioner(&cluster, false)
            .submit(&Profile::new("foo"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::ExecutionUnit);
        assert!(err.to_string().contains("no uid"), "{err}");
        assert!(!cluster.ops().contains(&Op::ReplaceConfigMap));
    }

    #[tokio::test]
    async fn owner_link_failure_keeps_the_job() {
        let cluster = RecordingCluster::new()
            .failing_on(Op::ReplaceConfigMap)
            .shared();
        let p = provisioner(&cluster, true).with_cleanup(CleanupPolicy::BestEffort);

        assert_eq!(stage_of(&p).await, Stage::OwnerLinkArtifact);
        let ops = cluster.ops();
        assert!(ops.contains(&Op::CreateJob));
        assert!(!ops.contains(&Op::DeleteConfigMap));
        assert!(!ops.contains(&Op::DeleteClaim));
        assert!(!ops.contains(&Op::ReplaceClaim));
    }

    #[tokio::test]
    async fn leave_policy_never_deletes() {
        let cluster = RecordingCluster::new().failing_on(Op::CreateJob).shared();
        stage_of(&provisioner(&cluster, true)).await;

        assert_eq!(
            cluster.ops(),
            vec![Op::CreateConfigMap, Op::CreateClaim, Op::CreateJob]
        );
    }

    #[tokio::test]
    async fn best_effort_deletes_orphans_after_job_failure() {
        let cluster = RecordingCluster::new().failing_on(Op::CreateJob).shared();
        let p = provisioner(&cluster, true).with_cleanup(CleanupPolicy::BestEffort);

        assert_eq!(stage_of(&p).await, Stage::ExecutionUnit);
        assert_eq!(
            cluster.ops(),
            vec![
                Op::CreateConfigMap,
                Op::CreateClaim,
                Op::CreateJob,
                Op::DeleteClaim,
                Op::DeleteConfigMap,
            ]
        );
    }

    #[tokio::test]
    async fn best_effort_after_claim_failure_deletes_only_the_config_map() {
        let cluster = RecordingCluster::new().failing_on(Op::CreateClaim).shared();
        let p = provisioner(&cluster, true).with_cleanup(CleanupPolicy::BestEffort);

        assert_eq!(stage_of(&p).await, Stage::CacheClaim);
        assert_eq!(
            cluster.ops(),
            vec![Op::CreateConfigMap, Op::CreateClaim, Op::DeleteConfigMap]
        );
    }

    #[tokio::test]
    async fn failed_cleanup_keeps_the_original_stage() {
        let cluster = RecordingCluster::new()
            .failing_on(Op::CreateJob)
            .failing_on(Op::DeleteConfigMap)
            .shared();
        let p = provisioner(&cluster, false).with_cleanup(CleanupPolicy::BestEffort);

        assert_eq!(stage_of(&p).await, Stage::ExecutionUnit);
        assert_eq!(cluster.ops().last(), Some(&Op::DeleteConfigMap));
    }

    #[tokio::test]
    async fn unreachable_cluster_is_a_connect_failure() {
        let p = Provisioner::new(fixed_builder(false), Arc::new(UnreachableCluster));
        assert_eq!(stage_of(&p).await, Stage::Connect);
    }

    #[tokio::test]
    async fn build_failure_happens_before_connecting() {
        let cluster = RecordingCluster::new().shared();
        let builder = ResourceBuilder::new(Arc::new(WorkloadConfig {
            worker_config_path: Some("/nonexistent/reticle/worker.yaml".into()),
            ..config(false)
        }));
        let p = Provisioner::new(builder, Arc::new(SharedCluster::new(cluster.clone())));

        assert_eq!(stage_of(&p).await, Stage::Build);
        assert!(cluster.ops().is_empty());
    }

    #[tokio::test]
    async fn identical_submissions_get_distinct_ids() {
        let cluster = RecordingCluster::new().shared();
        let p = Provisioner::new(
            ResourceBuilder::new(Arc::new(config(false))),
            Arc::new(SharedCluster::new(cluster.clone())),
        );

        let a = p.submit(&Profile::new("foo")).await.unwrap();
        let b = p.submit(&Profile::new("foo")).await.unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("assessor-"));
        assert!(ResourceName::new(a.as_str()).is_ok());
    }

    #[tokio::test]
    async fn metrics_record_outcome_and_stage() {
        let metrics = Arc::new(CountingMetrics::default());

        let ok = RecordingCluster::new().shared();
        provisioner(&ok, false)
            .with_metrics(metrics.clone())
            .submit(&Profile::new("foo"))
            .await
            .unwrap();

        let failing = RecordingCluster::new().failing_on(Op::CreateJob).shared();
        let _ = provisioner(&failing, false)
            .with_metrics(metrics.clone())
            .submit(&Profile::new("foo"))
            .await;

        assert_eq!(
            *metrics.outcomes.lock().unwrap(),
            vec![SubmissionOutcome::Created, SubmissionOutcome::Failed]
        );
        assert_eq!(*metrics.stages.lock().unwrap(), vec![Stage::ExecutionUnit]);
    }
}
