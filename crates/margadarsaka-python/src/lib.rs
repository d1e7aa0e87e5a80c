//! Python bindings for Margadarsaka secrets resolution via PyO3

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pyo3::create_exception;
use pyo3::exceptions::{PyKeyError, PyOSError, PyValueError};
use pyo3::prelude::*;

use margadarsaka_core::config::{ConfigError, ResolverConfig};
use margadarsaka_core::logging::{self, LogConfig};
use margadarsaka_core::resolver::ProviderStatus as CoreProviderStatus;
use margadarsaka_core::settings::{AppSettings as CoreAppSettings, SettingsError};
use margadarsaka_core::{ResolveError, SecretsResolver as CoreSecretsResolver};

create_exception!(margadarsaka_secrets, MissingConfigurationError, PyKeyError);
create_exception!(margadarsaka_secrets, InvalidKeyError, PyValueError);

fn resolve_err(e: ResolveError) -> PyErr {
    match e {
        ResolveError::MissingConfiguration { .. } => MissingConfigurationError::new_err(e.to_string()),
        ResolveError::InvalidKey { .. } => InvalidKeyError::new_err(e.to_string()),
    }
}

fn config_err(e: ConfigError) -> PyErr {
    match e {
        ConfigError::Io { .. } => PyOSError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn settings_err(e: SettingsError) -> PyErr {
    match e {
        SettingsError::Resolve(inner) => resolve_err(inner),
        other => PyValueError::new_err(other.to_string()),
    }
}

// ============================================================================
// ProviderStatus
// ============================================================================

#[pyclass(frozen)]
#[derive(Clone)]
pub struct ProviderStatus {
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub kind: String,
    /// None until the provider has been consulted
    #[pyo3(get)]
    pub active: Option<bool>,
}

#[pymethods]
impl ProviderStatus {
    fn __repr__(&self) -> String {
        let active = match self.active {
            Some(true) => "True",
            Some(false) => "False",
            None => "None",
        };
        format!("ProviderStatus(name='{}', kind='{}', active={})", self.name, self.kind, active)
    }
}

impl From<CoreProviderStatus> for ProviderStatus {
    fn from(status: CoreProviderStatus) -> Self {
        Self {
            name: status.name,
            kind: status.kind,
            active: status.active,
        }
    }
}

// ============================================================================
// SecretsResolver
// ============================================================================

#[pyclass(frozen)]
pub struct SecretsResolver {
    inner: Arc<CoreSecretsResolver>,
}

#[pymethods]
impl SecretsResolver {
    /// Build from an explicit config file, or discover one for the workspace
    #[new]
    #[pyo3(signature = (config_path=None, workspace=None))]
    pub fn new(config_path: Option<PathBuf>, workspace: Option<PathBuf>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => {
                let config = ResolverConfig::load(&path).map_err(config_err)?;
                match workspace {
                    Some(ws) => config.with_base_dir(ws),
                    None => config,
                }
            }
            None => ResolverConfig::discover(workspace.as_deref()).map_err(config_err)?,
        };
        let inner = CoreSecretsResolver::from_config(&config).map_err(config_err)?;
        Ok(Self { inner: Arc::new(inner) })
    }

    /// Resolve a key; raises MissingConfigurationError or InvalidKeyError
    pub fn resolve(&self, py: Python<'_>, key: &str) -> PyResult<String> {
        let inner = Arc::clone(&self.inner);
        py.allow_threads(move || inner.resolve(key)).map_err(resolve_err)
    }

    pub fn resolve_or(&self, py: Python<'_>, key: &str, fallback: &str) -> PyResult<String> {
        let inner = Arc::clone(&self.inner);
        py.allow_threads(move || inner.resolve_or(key, fallback)).map_err(resolve_err)
    }

    /// Returns (values, missing)
    pub fn resolve_all(&self, py: Python<'_>, keys: Vec<String>) -> (HashMap<String, String>, Vec<String>) {
        let inner = Arc::clone(&self.inner);
        py.allow_threads(move || inner.resolve_all(keys.as_slice()).into_parts())
    }

    pub fn is_provider_active(&self, name: &str) -> bool {
        self.inner.is_provider_active(name)
    }

    pub fn probe(&self, py: Python<'_>) -> Vec<ProviderStatus> {
        let inner = Arc::clone(&self.inner);
        py.allow_threads(move || inner.probe())
            .into_iter()
            .map(ProviderStatus::from)
            .collect()
    }

    pub fn provider_statuses(&self) -> Vec<ProviderStatus> {
        self.inner
            .provider_statuses()
            .into_iter()
            .map(ProviderStatus::from)
            .collect()
    }

    pub fn active_source(&self) -> Option<String> {
        self.inner.active_source()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.inner.provider_names().into_iter().map(String::from).collect()
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.invalidate(key)
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub fn __len__(&self) -> usize {
        self.inner.cached_len()
    }

    fn __repr__(&self) -> String {
        format!("SecretsResolver(providers={:?})", self.inner.provider_names())
    }
}

// ============================================================================
// AppSettings
// ============================================================================

#[pyclass(frozen)]
pub struct AppSettings {
    #[pyo3(get)]
    pub database_url: String,
    #[pyo3(get)]
    pub gemini_api_key: Option<String>,
    #[pyo3(get)]
    pub openai_api_key: Option<String>,
    #[pyo3(get)]
    pub secret_key: String,
    #[pyo3(get)]
    pub environment: String,
    #[pyo3(get)]
    pub debug: bool,
    #[pyo3(get)]
    pub api_base_url: String,
    #[pyo3(get)]
    pub ui_base_url: String,
    #[pyo3(get)]
    pub vault_active: bool,
    summary: Vec<(&'static str, String)>,
}

#[pymethods]
impl AppSettings {
    #[getter]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Settings with credentials reduced to "set"/"unset"
    pub fn summary(&self) -> HashMap<&'static str, String> {
        self.summary.iter().cloned().collect()
    }

    fn __repr__(&self) -> String {
        let fields: Vec<String> = self
            .summary
            .iter()
            .map(|(k, v)| format!("{}='{}'", k, v))
            .collect();
        format!("AppSettings({})", fields.join(", "))
    }
}

impl From<CoreAppSettings> for AppSettings {
    fn from(settings: CoreAppSettings) -> Self {
        let summary = settings.redacted_summary().into_iter().collect();
        Self {
            database_url: settings.database_url,
            gemini_api_key: settings.gemini_api_key,
            openai_api_key: settings.openai_api_key,
            secret_key: settings.secret_key,
            environment: settings.environment.to_string(),
            debug: settings.debug,
            api_base_url: settings.api_base_url,
            ui_base_url: settings.ui_base_url,
            vault_active: settings.vault_active,
            summary,
        }
    }
}

/// Load typed settings, discovering a resolver when none is given
#[pyfunction]
#[pyo3(signature = (resolver=None))]
fn load_settings(py: Python<'_>, resolver: Option<PyRef<'_, SecretsResolver>>) -> PyResult<AppSettings> {
    let inner = match resolver {
        Some(r) => Arc::clone(&r.inner),
        None => Arc::new(CoreSecretsResolver::discover(None).map_err(config_err)?),
    };
    let settings = py
        .allow_threads(move || CoreAppSettings::load(&inner))
        .map_err(settings_err)?;
    Ok(settings.into())
}

/// Print resolver logs to stderr (and optionally a file); returns False if
/// logging was already set up
#[pyfunction]
#[pyo3(signature = (level=None, file=None))]
fn init_logging(level: Option<String>, file: Option<PathBuf>) -> bool {
    let mut config = LogConfig::from_env();
    if let Some(level) = level {
        config = config.with_level(level);
    }
    if let Some(file) = file {
        config = config.with_file(file);
    }
    logging::init(config)
}

#[pymodule]
fn margadarsaka_secrets(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SecretsResolver>()?;
    m.add_class::<ProviderStatus>()?;
    m.add_class::<AppSettings>()?;
    m.add_function(wrap_pyfunction!(load_settings, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add("MissingConfigurationError", m.py().get_type::<MissingConfigurationError>())?;
    m.add("InvalidKeyError", m.py().get_type::<InvalidKeyError>())?;
    Ok(())
}
