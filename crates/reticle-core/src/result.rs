use std::fmt;

use reticle_model::ExecutionUnitId;
use serde::Serialize;

use crate::error::ProvisionError;

/// Step of a submission, used to classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Describing resources (naming, encoding, worker config read).
    Build,
    /// Obtaining a cluster client.
    Connect,
    ArtifactStore,
    CacheClaim,
    ExecutionUnit,
    OwnerLinkArtifact,
    OwnerLinkCache,
}

impl Stage {
    /// Stable label, also used as a metrics label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Connect => "connect",
            Stage::ArtifactStore => "artifact_store",
            Stage::CacheClaim => "cache_claim",
            Stage::ExecutionUnit => "execution_unit",
            Stage::OwnerLinkArtifact => "owner_link_artifact",
            Stage::OwnerLinkCache => "owner_link_cache",
        }
    }

    /// Whether the execution unit was already accepted when this stage failed.
    pub fn after_execution_unit(&self) -> bool {
        matches!(self, Stage::OwnerLinkArtifact | Stage::OwnerLinkCache)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Created(ExecutionUnitId),
    Failed { stage: Stage, message: String },
}

impl From<Result<ExecutionUnitId, ProvisionError>> for SubmissionResult {
    fn from(res: Result<ExecutionUnitId, ProvisionError>) -> Self {
        match res {
            Ok(id) => SubmissionResult::Created(id),
            Err(e) => SubmissionResult::Failed {
                stage: e.stage(),
                message: e.to_string(),
            },
        }
    }
}
