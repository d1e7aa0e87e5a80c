//! System keychain provider
//!
//! Uses the OS keychain:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;

use super::traits::{Provider, ProviderError, ProviderKind, ProviderResult};

const TARGET: &str = "margadarsaka::providers::keychain";

/// Provider backed by the system keychain
///
/// Not part of the default chain; useful on developer workstations where
/// credentials should not sit in a plaintext `.env`. Entries are namespaced
/// by a service name (default `margadarsaka`).
///
/// # Example
///
/// ```no_run
/// use margadarsaka_core::providers::{KeychainProvider, Provider};
///
/// let keychain = KeychainProvider::new();
/// keychain.store("GEMINI_API_KEY", "gm-...").unwrap();
/// assert!(keychain.fetch("GEMINI_API_KEY").unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a keychain provider with the default service name "margadarsaka"
    pub fn new() -> Self {
        Self::with_service("margadarsaka")
    }

    /// Create a keychain provider with a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> ProviderResult<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            ProviderError::unavailable(self.name(), format!("failed to create keychain entry: {}", e))
        })
    }

    /// Store a secret in the keychain
    pub fn store(&self, key: &str, value: &str) -> ProviderResult<()> {
        tracing::info!(target: TARGET, key, service = %self.service_name, "storing secret");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| ProviderError::Other(format!("failed to store in keychain: {}", e)))
    }

    /// Remove a secret from the keychain; missing entries are not an error
    pub fn delete(&self, key: &str) -> ProviderResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ProviderError::Other(format!("failed to delete from keychain: {}", e))),
        }
    }
}

impl Default for KeychainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for KeychainProvider {
    fn name(&self) -> &str {
        "keychain"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Keychain
    }

    fn check_available(&self) -> bool {
        // Fails on headless servers without a keychain daemon
        match Entry::new(&self.service_name, "__margadarsaka_availability_check__") {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(target: TARGET, error = %e, "keychain unavailable");
                false
            }
        }
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(password) => {
                tracing::debug!(target: TARGET, key, len = password.len(), "found in keychain");
                Ok(Some(password))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ProviderError::unavailable(self.name(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These require a running keychain service and are skipped on CI

    #[test]
    #[ignore] // Requires system keychain
    fn test_store_fetch_delete() {
        let keychain = KeychainProvider::with_service("margadarsaka-test");
        let _ = keychain.delete("test_key");

        keychain.store("test_key", "test_value").unwrap();
        assert_eq!(keychain.fetch("test_key").unwrap(), Some("test_value".to_string()));

        keychain.delete("test_key").unwrap();
        assert_eq!(keychain.fetch("test_key").unwrap(), None);
    }

    #[test]
    fn test_name_and_service() {
        let keychain = KeychainProvider::new();
        assert_eq!(keychain.name(), "keychain");
        assert_eq!(keychain.service(), "margadarsaka");
        assert_eq!(KeychainProvider::with_service("x").service(), "x");
    }
}
