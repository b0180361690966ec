use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Longest name accepted for a DNS-1123 label.
const MAX_LEN: usize = 63;

/// Shared name of every resource created for one submission.
///
/// Always a valid DNS-1123 label: lowercase alphanumerics and `-`,
/// starting and ending with an alphanumeric, at most 63 characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Validate an externally supplied name.
    pub fn new(name: impl Into<String>) -> ModelResult<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Build `"<prefix>-<uuid>"`, or the bare uuid when `prefix` is empty.
    pub fn from_uuid(prefix: &str, id: Uuid) -> ModelResult<Self> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Self::new(id.to_string());
        }
        Self::new(format!("{prefix}-{id}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> ModelResult<()> {
    let invalid = |reason| ModelError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.len() > MAX_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("only lowercase alphanumerics and '-' are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with an alphanumeric"));
    }
    Ok(())
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceName {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ResourceName> for String {
    fn from(n: ResourceName) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_uuid_is_valid() {
        let id = Uuid::new_v4();
        let name = ResourceName::from_uuid("assessor", id).unwrap();
        assert_eq!(name.as_str(), format!("assessor-{id}"));
    }

    #[test]
    fn empty_prefix_yields_bare_uuid() {
        let id = Uuid::new_v4();
        let name = ResourceName::from_uuid("  ", id).unwrap();
        assert_eq!(name.as_str(), id.to_string());
    }

    #[test]
    fn prefix_is_lowercased() {
        let id = Uuid::nil();
        let name = ResourceName::from_uuid("Assessor", id).unwrap();
        assert!(name.as_str().starts_with("assessor-"));
    }

    #[test]
    fn rejects_unsafe_names() {
        let long = "a".repeat(64);
        for bad in ["", "Upper", "under_score", "-lead", "trail-", "dot.ted", long.as_str()] {
            assert!(ResourceName::new(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn serde_validates_on_deserialize() {
        assert!(serde_json::from_str::<ResourceName>(r#""ok-name""#).is_ok());
        assert!(serde_json::from_str::<ResourceName>(r#""Not OK""#).is_err());
    }
}
