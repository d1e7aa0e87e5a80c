//! Resolver configuration files (YAML or JSON)
//!
//! Supports an explicit override (`$MARGADARSAKA_SECRETS_CONFIG`), a
//! workspace-level file (`.config/margadarsaka/secrets.yaml`) and a user-level
//! file (`~/.config/margadarsaka/secrets.yaml`).

use std::fs;
use std::path::{Path, PathBuf};

use super::types::{ConfigError, ConfigResult, ConfigSource, ResolverConfig};

const TARGET: &str = "margadarsaka::config";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MARGADARSAKA_SECRETS_CONFIG";

const CONFIG_FILE_NAME: &str = "secrets.yaml";

/// Workspace-level config path (`<workspace>/.config/margadarsaka/secrets.yaml`)
pub fn workspace_config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root
        .as_ref()
        .join(".config")
        .join("margadarsaka")
        .join(CONFIG_FILE_NAME)
}

/// User-level config path
pub fn user_config_path() -> PathBuf {
    // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
    config_dir.join("margadarsaka").join(CONFIG_FILE_NAME)
}

impl ResolverConfig {
    /// Load a config file; `.json` is parsed as JSON, everything else as YAML
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut config: ResolverConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        config.source = ConfigSource::File(path.to_path_buf());

        tracing::debug!(
            target: TARGET,
            path = %path.display(),
            providers = config.providers.len(),
            defaults = config.defaults.len(),
            "loaded resolver config"
        );
        Ok(config)
    }

    /// Find the config that applies to `workspace`
    ///
    /// Checks `$MARGADARSAKA_SECRETS_CONFIG`, then the workspace file, then
    /// the user file, and falls back to [`ResolverConfig::builtin`]. Relative
    /// file provider paths resolve against the workspace (or the current
    /// directory without one).
    pub fn discover(workspace: Option<&Path>) -> ConfigResult<Self> {
        let override_path = std::env::var_os(CONFIG_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::discover_in(override_path, workspace, Some(user_config_path()))
    }

    pub(crate) fn discover_in(
        override_path: Option<PathBuf>,
        workspace: Option<&Path>,
        user_path: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        let (mut config, source) = if let Some(path) = override_path {
            // An explicit override must exist
            (Self::load(&path)?, ConfigSource::EnvOverride(path))
        } else if let Some(path) = workspace.map(workspace_config_path).filter(|p| p.is_file()) {
            (Self::load(&path)?, ConfigSource::Workspace(path))
        } else if let Some(path) = user_path.filter(|p| p.is_file()) {
            (Self::load(&path)?, ConfigSource::User(path))
        } else {
            (Self::builtin(), ConfigSource::BuiltIn)
        };

        config.source = source;
        if config.base_dir.is_none() {
            config.base_dir = workspace.map(Path::to_path_buf);
        }

        tracing::info!(
            target: TARGET,
            source = config.source.as_str(),
            path = ?config.source.path(),
            "resolver config selected"
        );
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the config as YAML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        fs::write(path, self.to_yaml()?).map_err(|e| ConfigError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = write(dir.path(), "a.yaml", "providers:\n  - type: env\n");
        let json = write(
            dir.path(),
            "b.json",
            r#"{"providers":[{"type":"file","path":".env"}],"defaults":{"DEBUG":"false"}}"#,
        );

        let from_yaml = ResolverConfig::load(&yaml).unwrap();
        assert_eq!(from_yaml.providers.len(), 1);
        assert_eq!(from_yaml.source, ConfigSource::File(yaml.clone()));

        let from_json = ResolverConfig::load(&json).unwrap();
        assert!(matches!(from_json.providers[0], ProviderConfig::File(_)));
        assert_eq!(from_json.defaults.get("DEBUG").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ResolverConfig::load(dir.path().join("absent.yaml")),
            Err(ConfigError::Io { .. })
        ));

        let bad = write(dir.path(), "bad.yaml", "providers: [\n");
        assert!(matches!(ResolverConfig::load(&bad), Err(ConfigError::Yaml(_))));

        let bad_json = write(dir.path(), "bad.json", "{");
        assert!(matches!(ResolverConfig::load(&bad_json), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_discover_priority() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path().join("ws");
        let user = write(dir.path(), "user/secrets.yaml", "providers:\n  - type: keychain\n");

        // Nothing on disk
        let config = ResolverConfig::discover_in(None, Some(&workspace), None).unwrap();
        assert_eq!(config.source, ConfigSource::BuiltIn);
        assert_eq!(config.base_dir.as_deref(), Some(workspace.as_path()));

        // User file
        let config = ResolverConfig::discover_in(None, Some(&workspace), Some(user.clone())).unwrap();
        assert_eq!(config.source, ConfigSource::User(user.clone()));

        // Workspace beats user
        let ws_file = write(&workspace, ".config/margadarsaka/secrets.yaml", "providers:\n  - type: env\n");
        let config = ResolverConfig::discover_in(None, Some(&workspace), Some(user.clone())).unwrap();
        assert_eq!(config.source, ConfigSource::Workspace(ws_file));

        // Override beats everything
        let explicit = write(dir.path(), "explicit.yml", "defaults:\n  SECRET_KEY: s\n");
        let config =
            ResolverConfig::discover_in(Some(explicit.clone()), Some(&workspace), Some(user)).unwrap();
        assert_eq!(config.source, ConfigSource::EnvOverride(explicit));
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = ResolverConfig::discover_in(Some(dir.path().join("nope.yaml")), None, None);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/secrets.yaml");
        let config = ResolverConfig::builtin().with_default("ENVIRONMENT", "development");

        config.save(&path).unwrap();
        let loaded = ResolverConfig::load(&path).unwrap();
        assert_eq!(loaded.providers, config.providers);
        assert_eq!(loaded.defaults, config.defaults);
    }
}
