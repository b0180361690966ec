use std::fmt;

use serde::{Deserialize, Serialize};

/// Name the control plane reported for a created execution unit.
///
/// Carried through verbatim from the create response; never re-derived locally.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionUnitId(String);

impl ExecutionUnitId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionUnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExecutionUnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
