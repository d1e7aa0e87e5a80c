//! Managed secrets service provider
//!
//! Talks to a Doppler-compatible HTTP API:
//! - `GET {base}/v3/configs/config/secret?project=&config=&name=` for one key
//! - `GET {base}/v3/configs/config/secrets?project=&config=` to enumerate
//!
//! Requests carry `Authorization: Bearer <token>`. A `404` means the key is
//! absent; transport failures, auth rejections and server errors make the
//! provider unavailable for the current pass so a lower-priority source can
//! answer instead.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use super::traits::{Provider, ProviderError, ProviderKind, ProviderResult};

/// Default API base URL
pub const DEFAULT_VAULT_URL: &str = "https://api.doppler.com";

/// Default per-request timeout
pub const DEFAULT_VAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Deserialize)]
struct SecretValue {
    raw: Option<String>,
    computed: Option<String>,
}

impl SecretValue {
    fn into_value(self) -> Option<String> {
        self.computed
            .filter(|v| !v.is_empty())
            .or(self.raw.filter(|v| !v.is_empty()))
    }
}

#[derive(Deserialize)]
struct GetSecretResponse {
    value: SecretValue,
}

#[derive(Deserialize)]
struct ListSecretsResponse {
    secrets: HashMap<String, SecretValue>,
}

/// Provider backed by a remote secrets service
///
/// The production path. The HTTP client is created lazily on first use, so
/// building a provider never touches the network.
///
/// # Example
///
/// ```no_run
/// use margadarsaka_core::providers::{Provider, RemoteVaultProvider};
///
/// let vault = RemoteVaultProvider::new(
///     "https://api.doppler.com",
///     std::env::var("DOPPLER_TOKEN").ok(),
///     "margadarsaka",
///     "prd",
/// );
/// if vault.check_available() {
///     let _ = vault.fetch("GEMINI_API_KEY");
/// }
/// ```
pub struct RemoteVaultProvider {
    base_url: String,
    token: Option<String>,
    project: String,
    config: String,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl RemoteVaultProvider {
    /// Create a provider for a project/config pair
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        project: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            project: project.into(),
            config: config.into(),
            timeout: Duration::from_millis(DEFAULT_VAULT_TIMEOUT_MS),
            client: OnceCell::new(),
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    /// Whether credentials and a project/config pair are present
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
            && !self.base_url.is_empty()
            && !self.project.is_empty()
            && !self.config.is_empty()
    }

    fn client(&self) -> ProviderResult<&Client> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(ProviderError::from)
        })
    }

    fn get(&self, path: &str, extra: &[(&str, &str)]) -> ProviderResult<reqwest::blocking::Response> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ProviderError::unavailable(self.name(), "no access token configured"))?;

        let mut query: Vec<(&str, &str)> = vec![("project", self.project.as_str()), ("config", self.config.as_str())];
        query.extend_from_slice(extra);

        let response = self
            .client()?
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(&query)
            .send()?;
        Ok(response)
    }

    fn rejected(&self, status: StatusCode) -> ProviderError {
        let reason = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("access token rejected ({})", status.as_u16())
            }
            _ => format!("unexpected status {}", status.as_u16()),
        };
        ProviderError::unavailable(self.name(), reason)
    }
}

impl std::fmt::Debug for RemoteVaultProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteVaultProvider")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("project", &self.project)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Provider for RemoteVaultProvider {
    fn name(&self) -> &str {
        "vault"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Vault
    }

    fn check_available(&self) -> bool {
        let configured = self.is_configured();
        if !configured {
            tracing::debug!(target: "margadarsaka::providers::vault", "not configured for this process");
        }
        configured
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        let response = self.get("/v3/configs/config/secret", &[("name", key)])?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(target: "margadarsaka::providers::vault", key, "key not present in vault");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.rejected(status));
        }

        let body: GetSecretResponse = response.json()?;
        Ok(body.value.into_value())
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        let response = self.get("/v3/configs/config/secrets", &[])?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.rejected(status));
        }

        let body: ListSecretsResponse = response.json()?;
        let mut keys: Vec<String> = body
            .secrets
            .into_iter()
            .filter(|(_, v)| v.computed.is_some() || v.raw.is_some())
            .map(|(k, _)| k)
            .collect();
        keys.sort();
        Ok(keys)
    }
}
