//! Errors that cross the resolver boundary

use thiserror::Error;

/// Errors returned to callers of the resolver
///
/// Provider-level failures never surface here; they only cause fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Every provider (including registered defaults) was exhausted
    #[error("Missing configuration: no provider supplied '{key}'")]
    MissingConfiguration { key: String },

    /// The key was rejected before any provider was queried
    #[error("Invalid configuration key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl ResolveError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingConfiguration { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The key this error is about
    pub fn key(&self) -> &str {
        match self {
            Self::MissingConfiguration { key } | Self::InvalidKey { key, .. } => key,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingConfiguration { .. })
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Check that a key is well formed
///
/// Keys are case-sensitive and must be non-empty, without whitespace, `=`,
/// or control characters.
pub fn validate_key(key: &str) -> ResolveResult<()> {
    if key.is_empty() {
        return Err(ResolveError::invalid(key, "key is empty"));
    }
    if let Some(c) = key.chars().find(|c| c.is_whitespace() || c.is_control() || *c == '=') {
        return Err(ResolveError::invalid(key, format!("contains forbidden character {:?}", c)));
    }
    Ok(())
}
