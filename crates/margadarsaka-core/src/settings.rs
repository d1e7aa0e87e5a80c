//! Typed application settings
//!
//! The application's well-known keys, resolved once through a
//! [`SecretsResolver`] and parsed into concrete types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ResolveError;
use crate::resolver::SecretsResolver;

const TARGET: &str = "margadarsaka::settings";

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///margadarsaka.db";
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_UI_BASE_URL: &str = "http://localhost:8501";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{}', expected development, staging or production",
                other
            )),
        }
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err("expected a boolean (true/false, 1/0, yes/no, on/off)".to_string()),
    }
}

fn set_or_unset<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if value.is_some() { "set" } else { "unset" })
}

fn redacted<S: Serializer>(_: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("set")
}

/// Resolved application settings
///
/// Serializing never emits credentials: API keys and the secret key come out
/// as `"set"`/`"unset"`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    pub database_url: String,
    #[serde(serialize_with = "set_or_unset")]
    pub gemini_api_key: Option<String>,
    #[serde(serialize_with = "set_or_unset")]
    pub openai_api_key: Option<String>,
    #[serde(serialize_with = "redacted")]
    pub secret_key: String,
    pub environment: Environment,
    pub debug: bool,
    pub api_base_url: String,
    pub ui_base_url: String,
    /// Whether the remote vault answered during loading
    pub vault_active: bool,
}

impl AppSettings {
    /// Resolve every setting through `resolver`
    ///
    /// Missing optional keys take their fallback; a present but malformed
    /// `ENVIRONMENT` or `DEBUG` is an error.
    pub fn load(resolver: &SecretsResolver) -> SettingsResult<Self> {
        let environment = match resolver.resolve_optional("ENVIRONMENT")? {
            Some(raw) => raw.parse::<Environment>().map_err(|reason| SettingsError::InvalidValue {
                key: "ENVIRONMENT",
                value: raw.clone(),
                reason,
            })?,
            None => Environment::default(),
        };

        let debug = match resolver.resolve_optional("DEBUG")? {
            Some(raw) => parse_flag(&raw).map_err(|reason| SettingsError::InvalidValue {
                key: "DEBUG",
                value: raw.clone(),
                reason,
            })?,
            None => false,
        };

        let settings = Self {
            database_url: resolver.resolve_or("DATABASE_URL", DEFAULT_DATABASE_URL)?,
            gemini_api_key: resolver.resolve_optional("GEMINI_API_KEY")?,
            openai_api_key: resolver.resolve_optional("OPENAI_API_KEY")?,
            secret_key: resolver.resolve_or("SECRET_KEY", DEV_SECRET_KEY)?,
            environment,
            debug,
            api_base_url: resolver.resolve_or("API_BASE_URL", DEFAULT_API_BASE_URL)?,
            ui_base_url: resolver.resolve_or("UI_BASE_URL", DEFAULT_UI_BASE_URL)?,
            vault_active: resolver.is_provider_active("vault"),
        };

        tracing::debug!(
            target: TARGET,
            environment = %settings.environment,
            vault_active = settings.vault_active,
            "settings loaded"
        );
        settings.warn_insecure_defaults();
        Ok(settings)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Warn when production runs on the development secret key
    ///
    /// Returns whether a warning was emitted.
    pub fn warn_insecure_defaults(&self) -> bool {
        let insecure = self.is_production() && self.secret_key == DEV_SECRET_KEY;
        if insecure {
            tracing::warn!(
                target: TARGET,
                "SECRET_KEY is the development default in production; configure a real key"
            );
        }
        insecure
    }

    /// Human-readable overview with credentials reduced to "set"/"unset"
    pub fn redacted_summary(&self) -> BTreeMap<&'static str, String> {
        let flag = |v: &Option<String>| (if v.is_some() { "set" } else { "unset" }).to_string();
        let mut summary = BTreeMap::new();
        summary.insert("environment", self.environment.to_string());
        summary.insert("debug", self.debug.to_string());
        summary.insert("database_url", self.database_url.clone());
        summary.insert("api_base_url", self.api_base_url.clone());
        summary.insert("ui_base_url", self.ui_base_url.clone());
        summary.insert("gemini_api_key", flag(&self.gemini_api_key));
        summary.insert("openai_api_key", flag(&self.openai_api_key));
        summary.insert(
            "secret_key",
            (if self.secret_key == DEV_SECRET_KEY { "development default" } else { "set" }).to_string(),
        );
        summary.insert("vault_active", self.vault_active.to_string());
        summary
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.redacted_summary()).finish()
    }
}
