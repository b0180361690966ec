//! Inbound submission payload and its validated form.
mod request;
pub use request::{ProfileRequest, TEXT_REQUIRED};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Free-form metadata attached to a profile.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Validated submission.
///
/// Only `text` is consumed by provisioning; `metadata` travels to the worker untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Profile {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Encode the profile as the JSON document handed to the worker.
    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string(self).map_err(|e| ModelError::Invalid(e.to_string()))
    }
}

impl TryFrom<ProfileRequest> for Profile {
    type Error = ModelError;

    fn try_from(req: ProfileRequest) -> Result<Self, Self::Error> {
        let errors = req.validate();
        match req.text {
            Some(text) if errors.is_empty() => Ok(Profile {
                text,
                metadata: req.metadata,
            }),
            _ => Err(ModelError::Validation(errors)),
        }
    }
}
