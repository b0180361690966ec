use serde::{Deserialize, Serialize};

/// Single environment variable handed to a worker container.
///
/// Values are passed through verbatim, empty strings included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Split into owned `(key, value)`.
    pub fn into_parts(self) -> (String, String) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KeyValue
where
    K: Into<String>,
    V: Into<String>,
{
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
