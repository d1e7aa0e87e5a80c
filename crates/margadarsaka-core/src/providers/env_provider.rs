//! Process environment provider

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{Provider, ProviderKind, ProviderResult};

/// Alternate variable names for well-known credentials
static ENV_ALIASES: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("GEMINI_API_KEY", vec!["GOOGLE_API_KEY"]);
    m.insert("GOOGLE_API_KEY", vec!["GEMINI_API_KEY"]);
    m.insert("AZURE_OPENAI_API_KEY", vec!["AZURE_API_KEY"]);
    m
});

/// Provider that reads the calling process's environment
///
/// This is the CI path: pipelines export secrets as variables and nothing
/// else needs to be configured. Lookups are case-sensitive. Empty values are
/// treated as unset.
///
/// # Prefix
///
/// With a prefix of `MARGA_`, the key `DATABASE_URL` reads
/// `$MARGA_DATABASE_URL`, then falls back to `$DATABASE_URL`.
///
/// # Example
///
/// ```
/// use margadarsaka_core::providers::{Provider, ProcessEnvironmentProvider};
///
/// let provider = ProcessEnvironmentProvider::with_prefix("MARGA_");
/// // Checks $MARGA_SECRET_KEY, then $SECRET_KEY
/// let _ = provider.fetch("SECRET_KEY");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironmentProvider {
    prefix: Option<String>,
}

impl ProcessEnvironmentProvider {
    /// Create a provider reading variables by their exact name
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Create a provider that prefers `{prefix}{key}` over `{key}`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        }
    }

    /// Get the alternate variable names for a key
    pub fn aliases_for(key: &str) -> &'static [&'static str] {
        ENV_ALIASES.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn read(name: &str) -> Option<String> {
        match env::var(name) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

impl Provider for ProcessEnvironmentProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Environment
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        if let Some(prefix) = &self.prefix {
            if let Some(value) = Self::read(&format!("{}{}", prefix, key)) {
                return Ok(Some(value));
            }
        }

        if let Some(value) = Self::read(key) {
            return Ok(Some(value));
        }

        for alias in Self::aliases_for(key) {
            if let Some(value) = Self::read(alias) {
                tracing::debug!(target: "margadarsaka::providers::env", key, alias, "resolved through alias");
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        let mut keys: Vec<String> = env::vars()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| match &self.prefix {
                Some(prefix) => k.strip_prefix(prefix.as_str()).map(str::to_string).unwrap_or(k),
                None => k,
            })
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
