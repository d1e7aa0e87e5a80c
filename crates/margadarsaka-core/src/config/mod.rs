//! Resolver configuration
//!
//! Describes the provider chain as data:
//! - `ResolverConfig`: ordered providers plus fallback defaults
//! - YAML/JSON files at workspace or user level, or an explicit override
//! - A built-in vault -> `.env` -> environment chain when nothing is configured

mod types;
mod file;

pub use types::{
    ConfigError, ConfigResult, ConfigSource, EnvConfig, FileConfig, KeychainConfig, MemoryConfig,
    ProviderConfig, ResolverConfig, VaultConfig,
};
pub use file::{user_config_path, workspace_config_path, CONFIG_PATH_ENV};
