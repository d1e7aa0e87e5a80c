//! Resolution cache

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Result of resolving one key
///
/// Immutable once created. `Debug` never prints the raw value.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    key: String,
    value: Arc<str>,
    source: String,
    resolved_at: DateTime<Utc>,
}

impl ResolvedValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>, source: impl Into<String>) -> Self {
        let value: String = value.into();
        Self {
            key: key.into(),
            value: Arc::from(value),
            source: source.into(),
            resolved_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The raw value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name of the provider that produced the value
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

impl std::fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedValue")
            .field("key", &self.key)
            .field("value", &format!("<{} bytes>", self.value.len()))
            .field("source", &self.source)
            .field("resolved_at", &self.resolved_at)
            .finish()
    }
}

/// Map from key to its resolved value
///
/// Holds at most one value per key. Entries are only removed by explicit
/// invalidation; there is no expiry.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, ResolvedValue>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<ResolvedValue> {
        self.entries.read().get(key).cloned()
    }

    /// Insert unless the key is already present; returns the stored value
    pub fn insert(&self, value: ResolvedValue) -> ResolvedValue {
        let mut entries = self.entries.write();
        entries
            .entry(value.key.clone())
            .or_insert(value)
            .clone()
    }

    /// Drop one key; returns whether it was cached
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached keys with the provider that produced each, sorted by key
    pub fn sources(&self) -> Vec<(String, String)> {
        let mut sources: Vec<(String, String)> = self
            .entries
            .read()
            .values()
            .map(|v| (v.key.clone(), v.source.clone()))
            .collect();
        sources.sort();
        sources
    }
}
