//! Resolver configuration types

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::{
    DefaultValueProvider, FileFormat, KeychainProvider, LocalFileProvider, MemoryProvider,
    ProcessEnvironmentProvider, Provider, RemoteVaultProvider, DEFAULT_VAULT_TIMEOUT_MS,
    DEFAULT_VAULT_URL,
};

/// Errors that can occur while loading or applying configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid provider #{index} ({kind}): {reason}")]
    InvalidProvider {
        index: usize,
        kind: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where a configuration came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path named by `MARGADARSAKA_SECRETS_CONFIG`
    EnvOverride(PathBuf),
    /// `<workspace>/.config/margadarsaka/secrets.yaml`
    Workspace(PathBuf),
    /// `<user config dir>/margadarsaka/secrets.yaml`
    User(PathBuf),
    /// An explicitly loaded file
    File(PathBuf),
    /// Built-in vault -> .env -> environment chain
    #[default]
    BuiltIn,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::EnvOverride(_) => "env-override",
            ConfigSource::Workspace(_) => "workspace",
            ConfigSource::User(_) => "user",
            ConfigSource::File(_) => "file",
            ConfigSource::BuiltIn => "built-in",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::EnvOverride(p)
            | ConfigSource::Workspace(p)
            | ConfigSource::User(p)
            | ConfigSource::File(p) => Some(p),
            ConfigSource::BuiltIn => None,
        }
    }
}

/// Top-level resolver configuration
///
/// ```yaml
/// providers:
///   - type: vault
///     project: margadarsaka
///     config: dev
///   - type: file
///     path: .env
///   - type: env
/// defaults:
///   DATABASE_URL: sqlite:///margadarsaka.db
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Providers in priority order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Fallback values, consulted after every provider
    #[serde(default)]
    pub defaults: HashMap<String, String>,

    /// Directory relative file paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,

    #[serde(skip)]
    pub source: ConfigSource,
}

/// One entry of the provider chain, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    Vault(VaultConfig),
    File(FileConfig),
    Env(EnvConfig),
    Keychain(KeychainConfig),
    Memory(MemoryConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Vault(_) => "vault",
            ProviderConfig::File(_) => "file",
            ProviderConfig::Env(_) => "env",
            ProviderConfig::Keychain(_) => "keychain",
            ProviderConfig::Memory(_) => "memory",
        }
    }
}

/// Remote vault settings
///
/// Missing `project`/`config` fall back to `DOPPLER_PROJECT`/`DOPPLER_CONFIG`
/// at build time; an inline `token` takes precedence over `token_env`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub token_env: String,
    pub project: Option<String>,
    pub config: Option<String>,
    pub timeout_ms: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VAULT_URL.to_string(),
            token: None,
            token_env: "DOPPLER_TOKEN".to_string(),
            project: None,
            config: None,
            timeout_ms: DEFAULT_VAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub path: PathBuf,
    /// Inferred from the extension when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FileFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeychainConfig {
    pub service: Option<String>,
}

/// Static values, mostly for fixtures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub name: Option<String>,
    pub values: HashMap<String, String>,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ResolverConfig {
    /// Vault, then `.env`, then the process environment
    pub fn builtin() -> Self {
        Self {
            providers: vec![
                ProviderConfig::Vault(VaultConfig::default()),
                ProviderConfig::File(FileConfig {
                    path: PathBuf::from(".env"),
                    format: Some(FileFormat::Dotenv),
                }),
                ProviderConfig::Env(EnvConfig::default()),
            ],
            ..Default::default()
        }
    }

    /// Resolve relative file paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Add (or replace) a fallback value
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Check settings that serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        for (index, provider) in self.providers.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidProvider {
                index,
                kind: provider.kind(),
                reason: reason.to_string(),
            };
            match provider {
                ProviderConfig::Vault(vault) => {
                    if vault.base_url.trim().is_empty() {
                        return Err(invalid("base_url is empty"));
                    }
                    if !vault.base_url.starts_with("http://") && !vault.base_url.starts_with("https://") {
                        return Err(invalid("base_url must be http(s)"));
                    }
                    if vault.timeout_ms == 0 {
                        return Err(invalid("timeout_ms must be positive"));
                    }
                }
                ProviderConfig::File(file) => {
                    if file.path.as_os_str().is_empty() {
                        return Err(invalid("path is empty"));
                    }
                }
                ProviderConfig::Memory(memory) => {
                    if memory.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                        return Err(invalid("name is empty"));
                    }
                }
                ProviderConfig::Env(_) | ProviderConfig::Keychain(_) => {}
            }
        }
        Ok(())
    }

    /// Instantiate the provider chain; defaults always come last
    pub fn build_providers(&self) -> ConfigResult<Vec<Arc<dyn Provider>>> {
        self.validate()?;

        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(self.providers.len() + 1);
        for provider in &self.providers {
            providers.push(self.build_one(provider));
        }
        if !self.defaults.is_empty() {
            providers.push(Arc::new(DefaultValueProvider::new(self.defaults.clone())));
        }
        Ok(providers)
    }

    fn build_one(&self, provider: &ProviderConfig) -> Arc<dyn Provider> {
        match provider {
            ProviderConfig::Vault(vault) => {
                let token = vault.token.clone().or_else(|| env_value(&vault.token_env));
                let project = vault.project.clone().or_else(|| env_value("DOPPLER_PROJECT"));
                let config = vault.config.clone().or_else(|| env_value("DOPPLER_CONFIG"));
                Arc::new(
                    RemoteVaultProvider::new(
                        vault.base_url.clone(),
                        token,
                        project.unwrap_or_default(),
                        config.unwrap_or_default(),
                    )
                    .with_timeout(Duration::from_millis(vault.timeout_ms)),
                )
            }
            ProviderConfig::File(file) => {
                let path = match &self.base_dir {
                    Some(base) if file.path.is_relative() => base.join(&file.path),
                    _ => file.path.clone(),
                };
                let format = file.format.unwrap_or_else(|| FileFormat::from_path(&path));
                Arc::new(LocalFileProvider::with_format(path, format))
            }
            ProviderConfig::Env(env) => match env.prefix.as_deref() {
                Some(prefix) => Arc::new(ProcessEnvironmentProvider::with_prefix(prefix)),
                None => Arc::new(ProcessEnvironmentProvider::new()),
            },
            ProviderConfig::Keychain(keychain) => match keychain.service.as_deref() {
                Some(service) => Arc::new(KeychainProvider::with_service(service)),
                None => Arc::new(KeychainProvider::new()),
            },
            ProviderConfig::Memory(memory) => Arc::new(MemoryProvider::with_values(
                memory.name.clone().unwrap_or_else(|| "memory".to_string()),
                memory.values.clone(),
            )),
        }
    }
}
