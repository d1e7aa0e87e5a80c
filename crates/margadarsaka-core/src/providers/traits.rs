//! Core traits and types for secret providers

use thiserror::Error;

/// Errors a provider can report to the resolver
///
/// None of these cross the resolver boundary: `NotFound` is treated exactly
/// like `Ok(None)` and everything else downgrades the provider to
/// "unavailable" for the current resolution pass.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider '{provider}' unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Create an unavailable error
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error only means "this source does not have the key"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// The kind of a provider, used for diagnostics and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Vault,
    File,
    Environment,
    Default,
    Keychain,
    Memory,
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Vault => "vault",
            ProviderKind::File => "file",
            ProviderKind::Environment => "env",
            ProviderKind::Default => "default",
            ProviderKind::Keychain => "keychain",
            ProviderKind::Memory => "memory",
            ProviderKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for a single source of configuration values
///
/// Implementations:
/// - Managed secrets service over HTTP (`RemoteVaultProvider`)
/// - A key-value file on disk (`LocalFileProvider`)
/// - The process environment (`ProcessEnvironmentProvider`)
/// - Registered fallbacks (`DefaultValueProvider`)
/// - System keychain (`KeychainProvider`) and in-memory (`MemoryProvider`)
///
/// # Example
///
/// ```
/// use margadarsaka_core::providers::{Provider, ProcessEnvironmentProvider};
///
/// let provider = ProcessEnvironmentProvider::new();
/// assert!(provider.check_available());
/// // provider.fetch("GEMINI_API_KEY") reads $GEMINI_API_KEY
/// ```
pub trait Provider: Send + Sync {
    /// Unique name of this provider within a resolver
    fn name(&self) -> &str;

    /// What kind of source this is
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    /// Whether this provider can be consulted right now
    ///
    /// Must never panic or block for long. A vault without credentials or a
    /// missing file reports `false`.
    fn check_available(&self) -> bool {
        true
    }

    /// Look up a key
    ///
    /// Returns `Ok(None)` when the source simply does not hold the key.
    /// `Err` is reserved for transport or configuration failures.
    fn fetch(&self, key: &str) -> ProviderResult<Option<String>>;

    /// Keys this provider can currently enumerate
    ///
    /// Used for diagnostics only. Sources that cannot enumerate return an
    /// empty list.
    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::Vault.as_str(), "vault");
        assert_eq!(ProviderKind::Environment.to_string(), "env");
        assert_eq!(ProviderKind::Default.as_str(), "default");
    }

    #[test]
    fn test_error_helpers() {
        let err = ProviderError::unavailable("vault", "connection refused");
        assert_eq!(
            err.to_string(),
            "Provider 'vault' unavailable: connection refused"
        );
        assert!(!err.is_not_found());
        assert!(ProviderError::NotFound("KEY".into()).is_not_found());
    }
}
