//! In-memory cluster doubles for tests of this crate and of the HTTP layer.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::Metadata;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::cluster::{ClusterApi, ClusterConnector, ClusterError, ClusterResult};

/// Kind of call made against the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    CreateConfigMap,
    ReplaceConfigMap,
    DeleteConfigMap,
    CreateClaim,
    ReplaceClaim,
    DeleteClaim,
    CreateJob,
}

/// One recorded call and the object name it addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub name: String,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<Call>,
    config_maps: Vec<ConfigMap>,
    claims: Vec<PersistentVolumeClaim>,
    uids: u64,
}

/// [`ClusterApi`] that records calls, assigns `uid-N` on create and can fail on one op.
#[derive(Default)]
pub struct RecordingCluster {
    fail_on: Vec<Op>,
    job_name: Option<String>,
    omit_job_uid: bool,
    state: Mutex<Recorded>,
}

impl RecordingCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of kind `op` with a request error. May be repeated.
    pub fn failing_on(mut self, op: Op) -> Self {
        self.fail_on.push(op);
        self
    }

    /// Report `name` as the created Job's name instead of echoing the request.
    pub fn reporting_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    /// Return created Jobs without a uid.
    pub fn omitting_job_uid(mut self) -> Self {
        self.omit_job_uid = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.lock().calls.iter().map(|c| c.op).collect()
    }

    /// ConfigMaps as last sent through `replace_config_map`.
    pub fn replaced_config_maps(&self) -> Vec<ConfigMap> {
        self.lock().config_maps.clone()
    }

    /// Claims as last sent through `replace_claim`.
    pub fn replaced_claims(&self) -> Vec<PersistentVolumeClaim> {
        self.lock().claims.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: Op, name: &str) -> ClusterResult<()> {
        self.lock().calls.push(Call {
            op,
            name: name.to_string(),
        });
        if self.fail_on.contains(&op) {
            return Err(ClusterError::Request(format!("{op:?} refused")));
        }
        Ok(())
    }

    fn stamp<T: Metadata<Ty = ObjectMeta>>(&self, obj: &mut T) {
        let mut state = self.lock();
        state.uids += 1;
        let meta = obj.metadata_mut();
        meta.uid = Some(format!("uid-{}", state.uids));
        meta.resource_version = Some("1".into());
    }
}

fn name_of<T: Metadata<Ty = ObjectMeta>>(obj: &T) -> &str {
    obj.metadata().name.as_deref().unwrap_or_default()
}

#[async_trait]
impl ClusterApi for RecordingCluster {
    async fn create_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap> {
        self.record(Op::CreateConfigMap, name_of(cm))?;
        let mut created = cm.clone();
        self.stamp(&mut created);
        Ok(created)
    }

    async fn replace_config_map(&self, cm: &ConfigMap) -> ClusterResult<ConfigMap> {
        self.record(Op::ReplaceConfigMap, name_of(cm))?;
        self.lock().config_maps.push(cm.clone());
        Ok(cm.clone())
    }

    async fn delete_config_map(&self, name: &str) -> ClusterResult<()> {
        self.record(Op::DeleteConfigMap, name)
    }

    async fn create_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        self.record(Op::CreateClaim, name_of(pvc))?;
        let mut created = pvc.clone();
        self.stamp(&mut created);
        Ok(created)
    }

    async fn replace_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> ClusterResult<PersistentVolumeClaim> {
        self.record(Op::ReplaceClaim, name_of(pvc))?;
        self.lock().claims.push(pvc.clone());
        Ok(pvc.clone())
    }

    async fn delete_claim(&self, name: &str) -> ClusterResult<()> {
        self.record(Op::DeleteClaim, name)
    }

    async fn create_job(&self, job: &Job) -> ClusterResult<Job> {
        self.record(Op::CreateJob, name_of(job))?;
        let mut created = job.clone();
        self.stamp(&mut created);
        if self.omit_job_uid {
            created.metadata.uid = None;
        }
        if let Some(name) = &self.job_name {
            created.metadata.name = Some(name.clone());
        }
        Ok(created)
    }
}

/// Connector that never reaches a cluster.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnreachableCluster;

#[async_trait]
impl ClusterConnector for UnreachableCluster {
    async fn connect(&self) -> ClusterResult<Arc<dyn ClusterApi>> {
        Err(ClusterError::Connect("no cluster configured".into()))
    }
}
