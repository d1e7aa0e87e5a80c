//! In-memory provider

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{Provider, ProviderKind, ProviderResult};

/// In-memory provider for testing and ephemeral use
///
/// Values live in memory and are fully read-write. The provider can also be
/// switched offline to simulate an unreachable source.
///
/// # Example
///
/// ```
/// use margadarsaka_core::providers::{Provider, MemoryProvider};
///
/// let provider = MemoryProvider::new("memory");
/// provider.insert("GEMINI_API_KEY", "test-key");
/// assert_eq!(provider.fetch("GEMINI_API_KEY").unwrap(), Some("test-key".to_string()));
/// ```
#[derive(Debug)]
pub struct MemoryProvider {
    name: String,
    values: RwLock<HashMap<String, String>>,
    online: RwLock<bool>,
}

impl MemoryProvider {
    /// Create a new empty provider
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_values(name, HashMap::new())
    }

    /// Create a provider with initial values
    pub fn with_values(name: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            values: RwLock::new(values),
            online: RwLock::new(true),
        }
    }

    /// Insert or replace a value
    pub fn insert(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Mark the provider reachable or unreachable
    pub fn set_online(&self, online: bool) {
        *self.online.write() = online;
    }

    /// Get the number of values held
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check if the provider is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Memory
    }

    fn check_available(&self) -> bool {
        *self.online.read()
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_provider_crud() {
        let provider = MemoryProvider::new("memory");
        assert!(provider.is_empty());
        assert_eq!(provider.fetch("KEY").unwrap(), None);

        provider.insert("KEY", "value");
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.fetch("KEY").unwrap(), Some("value".to_string()));

        provider.insert("KEY", "new_value");
        assert_eq!(provider.fetch("KEY").unwrap(), Some("new_value".to_string()));

        assert_eq!(provider.remove("KEY"), Some("new_value".to_string()));
        assert!(provider.is_empty());
    }

    #[test]
    fn test_memory_provider_online_toggle() {
        let provider = MemoryProvider::new("staging");
        assert!(provider.check_available());
        provider.set_online(false);
        assert!(!provider.check_available());
        assert_eq!(provider.name(), "staging");
    }

    #[test]
    fn test_memory_provider_list_keys_sorted() {
        let mut initial = HashMap::new();
        initial.insert("B".to_string(), "2".to_string());
        initial.insert("A".to_string(), "1".to_string());
        let provider = MemoryProvider::with_values("memory", initial);
        assert_eq!(provider.list_keys().unwrap(), vec!["A", "B"]);
    }
}
