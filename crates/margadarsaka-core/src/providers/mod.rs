//! Secret provider abstractions and implementations
//!
//! This module provides the pluggable sources a resolver consults:
//! - `Provider` trait for implementing custom sources
//! - Built-in implementations: `RemoteVaultProvider`, `LocalFileProvider`,
//!   `ProcessEnvironmentProvider`, `DefaultValueProvider`, `KeychainProvider`,
//!   `MemoryProvider`

mod traits;
mod vault_provider;
mod file_provider;
mod env_provider;
mod default_provider;
mod keychain_provider;
mod memory_provider;

pub use traits::{Provider, ProviderError, ProviderKind, ProviderResult};
pub use vault_provider::{RemoteVaultProvider, DEFAULT_VAULT_URL, DEFAULT_VAULT_TIMEOUT_MS};
pub use file_provider::{LocalFileProvider, FileFormat};
pub use env_provider::ProcessEnvironmentProvider;
pub use default_provider::DefaultValueProvider;
pub use keychain_provider::KeychainProvider;
pub use memory_provider::MemoryProvider;
