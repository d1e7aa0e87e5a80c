//! Margadarsaka Core
//!
//! Layered secrets and configuration resolution. One resolver consults an
//! ordered chain of providers and hands back the first value found:
//!
//! - Remote vault (Doppler-compatible HTTP API) for production
//! - Local `.env` / YAML / JSON file for development
//! - Process environment for CI
//! - Registered defaults as the last resort
//!
//! Unreachable providers are skipped rather than failing the lookup, and
//! every resolved value is cached for the lifetime of the resolver.
//!
//! ```rust,ignore
//! use margadarsaka_core::{AppSettings, SecretsResolver};
//!
//! let resolver = SecretsResolver::discover(None)?;
//! let api_key = resolver.resolve("GEMINI_API_KEY")?;
//!
//! // Typed view of the application's well-known keys
//! let settings = AppSettings::load(&resolver)?;
//! println!("vault active: {}", settings.vault_active);
//! ```

pub mod error;
pub mod providers;
pub mod resolver;
pub mod config;
pub mod settings;
pub mod logging;

// Re-export commonly used types
pub use error::{validate_key, ResolveError, ResolveResult};

pub use providers::{
    Provider, ProviderError, ProviderKind, ProviderResult,
    RemoteVaultProvider, LocalFileProvider, FileFormat, ProcessEnvironmentProvider,
    DefaultValueProvider, KeychainProvider, MemoryProvider,
};

pub use resolver::{SecretsResolver, ResolvedValue, ResolutionCache, BatchResolution, ProviderStatus};

pub use config::{ResolverConfig, ProviderConfig, ConfigError, ConfigResult, ConfigSource};

pub use settings::{AppSettings, Environment, SettingsError, SettingsResult};

pub use logging::LogConfig;
