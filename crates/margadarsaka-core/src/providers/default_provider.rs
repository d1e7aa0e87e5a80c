//! Hard-coded fallback values

use std::collections::HashMap;

use super::traits::{Provider, ProviderKind, ProviderResult};

/// Provider that answers with registered fallback values
///
/// Sits at the end of every chain so keys that must always resolve (a local
/// database URL, a development secret key) do so even with no other source
/// configured. Always available.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueProvider {
    defaults: HashMap<String, String>,
}

impl DefaultValueProvider {
    pub fn new(defaults: HashMap<String, String>) -> Self {
        Self { defaults }
    }

    /// Register (or replace) a fallback
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

impl Provider for DefaultValueProvider {
    fn name(&self) -> &str {
        "default"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Default
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.defaults.get(key).cloned())
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        let mut keys: Vec<String> = self.defaults.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
