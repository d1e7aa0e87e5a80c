//! Local key-value file provider (.env, YAML, JSON)
//!
//! The development path: a `.env` next to the application, or a YAML/JSON
//! document when the team prefers structured files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::traits::{Provider, ProviderError, ProviderKind, ProviderResult};

/// On-disk format of a secrets file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// `KEY=value` lines, `#` comments, optional `export` and quotes
    Dotenv,
    /// Top-level YAML mapping of scalars
    Yaml,
    /// Top-level JSON object of scalars
    Json,
}

impl FileFormat {
    /// Infer the format from a file name; anything unrecognised is dotenv
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "yaml" || ext == "yml" => FileFormat::Yaml,
            Some(ext) if ext == "json" => FileFormat::Json,
            _ => FileFormat::Dotenv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Dotenv => "dotenv",
            FileFormat::Yaml => "yaml",
            FileFormat::Json => "json",
        }
    }
}

/// Provider backed by a key-value file
///
/// The file is parsed on first use and memoized; call [`reload`](Self::reload)
/// to pick up edits. A missing file makes the provider unavailable, and so
/// does a file that fails to parse.
///
/// # Example
///
/// ```no_run
/// use margadarsaka_core::providers::{Provider, LocalFileProvider};
///
/// let provider = LocalFileProvider::new(".env");
/// if provider.check_available() {
///     let _ = provider.fetch("DATABASE_URL");
/// }
/// ```
pub struct LocalFileProvider {
    path: PathBuf,
    format: FileFormat,
    cache: RwLock<Option<HashMap<String, String>>>,
}

impl LocalFileProvider {
    /// Create a provider for `path`, inferring the format from its extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self::with_format(path, format)
    }

    /// Create a provider with an explicit format
    pub fn with_format(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            cache: RwLock::new(None),
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file format
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Re-read the file from disk (invalidate the parsed snapshot)
    pub fn reload(&self) -> ProviderResult<usize> {
        let values = self.load()?;
        let count = values.len();
        *self.cache.write() = Some(values);
        Ok(count)
    }

    fn load(&self) -> ProviderResult<HashMap<String, String>> {
        if !self.path.is_file() {
            return Err(ProviderError::unavailable(
                self.name(),
                format!("{} does not exist", self.path.display()),
            ));
        }

        let values = match self.format {
            FileFormat::Dotenv => self.parse_dotenv()?,
            FileFormat::Yaml => {
                let content = fs::read_to_string(&self.path)?;
                let doc: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
                    .map_err(|e| ProviderError::parse(self.path.display().to_string(), e.to_string()))?;
                doc.into_iter()
                    .filter_map(|(k, v)| yaml_scalar(&v).map(|s| (k, s)))
                    .collect()
            }
            FileFormat::Json => {
                let content = fs::read_to_string(&self.path)?;
                let doc: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
                    .map_err(|e| ProviderError::parse(self.path.display().to_string(), e.to_string()))?;
                doc.into_iter()
                    .filter_map(|(k, v)| json_scalar(&v).map(|s| (k, s)))
                    .collect()
            }
        };

        tracing::debug!(
            target: "margadarsaka::providers::file",
            path = %self.path.display(),
            format = self.format.as_str(),
            count = values.len(),
            "loaded secrets file"
        );
        Ok(values)
    }

    fn parse_dotenv(&self) -> ProviderResult<HashMap<String, String>> {
        let iter = dotenvy::from_path_iter(&self.path)
            .map_err(|e| ProviderError::parse(self.path.display().to_string(), e.to_string()))?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| ProviderError::parse(self.path.display().to_string(), e.to_string()))?;
            if !value.is_empty() {
                values.insert(key, value);
            }
        }
        Ok(values)
    }

    /// Get cached or load values
    fn values(&self) -> ProviderResult<HashMap<String, String>> {
        if let Some(values) = self.cache.read().as_ref() {
            return Ok(values.clone());
        }

        let values = self.load()?;
        *self.cache.write() = Some(values.clone());
        Ok(values)
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl std::fmt::Debug for LocalFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileProvider")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("loaded", &self.cache.read().is_some())
            .finish()
    }
}

impl Provider for LocalFileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::File
    }

    fn check_available(&self) -> bool {
        self.cache.read().is_some() || self.path.is_file()
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        let mut keys: Vec<String> = self.values()?.into_keys().collect();
        keys.sort();
        Ok(keys)
    }
}
