use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Ordered list of environment variables for one container.
///
/// Order is preserved so the rendered container spec is stable between submissions.
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(Vec<KeyValue>);

impl Env {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set `key` to `value`, replacing an earlier entry with the same key.
    pub fn set<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let kv = KeyValue::new(key, value);
        match self.0.iter_mut().find(|e| e.key() == kv.key()) {
            Some(slot) => *slot = kv,
            None => self.0.push(kv),
        }
        self
    }

    /// Builder-style variant of [`Env::set`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|kv| kv.key() == key).map(|kv| kv.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }
}

impl IntoIterator for Env {
    type Item = KeyValue;
    type IntoIter = std::vec::IntoIter<KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
