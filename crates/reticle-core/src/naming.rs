//! Resource name generation.
use reticle_model::{ModelResult, ResourceName};
use uuid::Uuid;

/// Source of the shared resource name for each submission.
pub trait NameGenerator: Send + Sync {
    fn next_name(&self) -> ModelResult<ResourceName>;
}

/// `"<prefix>-<uuid v4>"` names.
#[derive(Debug, Clone)]
pub struct UuidNames {
    prefix: String,
}

impl UuidNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl NameGenerator for UuidNames {
    fn next_name(&self) -> ModelResult<ResourceName> {
        ResourceName::from_uuid(&self.prefix, Uuid::new_v4())
    }
}

/// Always hands out the same name.
#[derive(Debug, Clone)]
pub struct FixedNames(ResourceName);

impl FixedNames {
    pub fn new(name: ResourceName) -> Self {
        Self(name)
    }
}

impl NameGenerator for FixedNames {
    fn next_name(&self) -> ModelResult<ResourceName> {
        Ok(self.0.clone())
    }
}
