use async_trait::async_trait;
use reticle_model::{ExecutionUnitId, Profile};

use crate::error::ApiError;

/// Backend behind the HTTP routes.
///
/// [`ProvisionerAdapter`](crate::ProvisionerAdapter) is the stock implementation; wrap it to add
/// auth, rate limiting and the like.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Provision the resources for a validated profile.
    async fn submit_profile(&self, profile: Profile) -> Result<ExecutionUnitId, ApiError>;
}
