//! Layered secret resolution
//!
//! Providers are consulted in the order they were configured. The usual
//! chain is:
//! 1. Remote vault (production)
//! 2. Local file (development)
//! 3. Process environment (CI)
//! 4. Registered defaults
//!
//! The first provider that answers wins and the value is cached for the
//! lifetime of the resolver.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::cache::{ResolutionCache, ResolvedValue};
use crate::config::{ConfigResult, ResolverConfig};
use crate::error::{validate_key, ResolveError, ResolveResult};
use crate::providers::Provider;

const TARGET: &str = "margadarsaka::resolver";

/// A provider as registered with a resolver, under a unique name
struct ProviderSlot {
    name: String,
    provider: Arc<dyn Provider>,
}

/// Last-known state of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Name the provider is registered under
    pub name: String,
    /// Provider kind (`vault`, `file`, `env`, ...)
    pub kind: String,
    /// `None` until the provider has been consulted or probed
    pub active: Option<bool>,
}

/// Outcome of a batch resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResolution {
    /// Keys that resolved, with their values
    pub values: HashMap<String, String>,
    /// Keys that failed (missing everywhere or malformed), in request order
    pub missing: Vec<String>,
}

impl BatchResolution {
    /// Whether every requested key resolved
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Treat any missing key as fatal
    pub fn require_all(self) -> ResolveResult<HashMap<String, String>> {
        match self.missing.into_iter().next() {
            Some(key) => Err(ResolveError::missing(key)),
            None => Ok(self.values),
        }
    }

    pub fn into_parts(self) -> (HashMap<String, String>, Vec<String>) {
        (self.values, self.missing)
    }

    /// Batch where every requested key is reported missing
    fn all_missing<S: AsRef<str>>(keys: &[S]) -> Self {
        let mut seen = HashSet::new();
        let missing = keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|key| seen.insert(*key))
            .map(str::to_string)
            .collect();
        Self {
            values: HashMap::new(),
            missing,
        }
    }
}

/// One in-flight resolution of a key
#[derive(Default)]
struct Gate {
    pass: Mutex<()>,
    outcome: Mutex<Option<ResolveResult<ResolvedValue>>>,
}

/// Resolves configuration keys against an ordered provider chain
///
/// Owns its cache and provider list; several independently configured
/// resolvers can live in one process.
///
/// # Concurrency
///
/// Safe to share across threads (`Arc<SecretsResolver>`). Concurrent first
/// resolutions of the same key go through a per-key gate: one caller queries
/// the providers and everyone who joined meanwhile gets the same outcome,
/// including a miss. Unrelated keys never wait on each other.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use margadarsaka_core::providers::{DefaultValueProvider, MemoryProvider, Provider};
/// use margadarsaka_core::SecretsResolver;
///
/// let memory = Arc::new(MemoryProvider::new("memory"));
/// memory.insert("GEMINI_API_KEY", "gm-test");
///
/// let defaults = DefaultValueProvider::default()
///     .with_default("DATABASE_URL", "sqlite:///margadarsaka.db");
///
/// let providers: Vec<Arc<dyn Provider>> = vec![memory, Arc::new(defaults)];
/// let resolver = SecretsResolver::new(providers);
///
/// assert_eq!(resolver.resolve("GEMINI_API_KEY").unwrap(), "gm-test");
/// assert_eq!(resolver.resolve("DATABASE_URL").unwrap(), "sqlite:///margadarsaka.db");
/// assert!(resolver.resolve("OPENAI_API_KEY").is_err());
/// ```
pub struct SecretsResolver {
    providers: Vec<ProviderSlot>,
    cache: ResolutionCache,
    availability: RwLock<HashMap<String, bool>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl SecretsResolver {
    /// Create a resolver with a fresh cache
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self::with_cache(providers, ResolutionCache::new())
    }

    /// Create a resolver around an existing cache
    ///
    /// Providers sharing a name are registered as `name`, `name-2`, ...
    pub fn with_cache(providers: Vec<Arc<dyn Provider>>, cache: ResolutionCache) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut slots = Vec::with_capacity(providers.len());

        for provider in providers {
            let base = provider.name().to_string();
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{}-{}", base, n);
                n += 1;
            }
            if name != base {
                tracing::debug!(target: TARGET, provider = %base, registered_as = %name, "renamed duplicate provider");
            }
            slots.push(ProviderSlot { name, provider });
        }

        let chain: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        tracing::debug!(target: TARGET, chain = %chain.join(" -> "), "resolver created");

        Self {
            providers: slots,
            cache,
            availability: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &ResolverConfig) -> ConfigResult<Self> {
        Ok(Self::new(config.build_providers()?))
    }

    /// Resolver for the config discovered for `workspace`
    ///
    /// See [`ResolverConfig::discover`].
    pub fn discover(workspace: Option<&std::path::Path>) -> ConfigResult<Self> {
        Self::from_config(&ResolverConfig::discover(workspace)?)
    }

    /// Resolve a key to its value
    pub fn resolve(&self, key: &str) -> ResolveResult<String> {
        self.resolve_value(key).map(|v| v.value().to_string())
    }

    /// Resolve a key, keeping track of which provider answered
    pub fn resolve_value(&self, key: &str) -> ResolveResult<ResolvedValue> {
        validate_key(key)?;

        if let Some(hit) = self.cache.get(key) {
            tracing::trace!(target: TARGET, key, source = hit.source(), "cache hit");
            return Ok(hit);
        }

        let gate = self.gate(key);
        let outcome = {
            let _pass = gate.pass.lock();
            // Set once the first caller through this gate has finished
            let shared = gate.outcome.lock().clone();
            match shared {
                Some(outcome) => outcome,
                None => {
                    let outcome = match self.cache.get(key) {
                        Some(hit) => Ok(hit),
                        None => self.query_providers(key),
                    };
                    *gate.outcome.lock() = Some(outcome.clone());
                    outcome
                }
            }
        };
        self.release_gate(key, gate);
        outcome
    }

    /// Resolve a key, treating "missing everywhere" as `None`
    pub fn resolve_optional(&self, key: &str) -> ResolveResult<Option<String>> {
        match self.resolve(key) {
            Ok(value) => Ok(Some(value)),
            Err(ResolveError::MissingConfiguration { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve a key, falling back to `fallback` when no provider has it
    pub fn resolve_or(&self, key: &str, fallback: &str) -> ResolveResult<String> {
        Ok(self
            .resolve_optional(key)?
            .unwrap_or_else(|| fallback.to_string()))
    }

    /// Resolve several keys independently
    ///
    /// Never fails as a whole: keys that cannot be resolved are reported in
    /// [`BatchResolution::missing`].
    pub fn resolve_all<S: AsRef<str>>(&self, keys: &[S]) -> BatchResolution {
        let mut batch = BatchResolution::default();
        let mut seen = HashSet::new();

        for key in keys {
            let key = key.as_ref();
            if !seen.insert(key) {
                continue;
            }
            match self.resolve(key) {
                Ok(value) => {
                    batch.values.insert(key.to_string(), value);
                }
                Err(e) => {
                    tracing::debug!(target: TARGET, key, error = %e, "batch key unresolved");
                    batch.missing.push(key.to_string());
                }
            }
        }

        if !batch.missing.is_empty() {
            tracing::info!(
                target: TARGET,
                resolved = batch.values.len(),
                missing = batch.missing.len(),
                "batch resolution incomplete"
            );
        }
        batch
    }

    /// Whether a provider was available the last time it was consulted
    ///
    /// Reflects the most recent resolution pass or [`probe`](Self::probe);
    /// never performs I/O. Unknown providers report `false`.
    pub fn is_provider_active(&self, name: &str) -> bool {
        self.availability.read().get(name).copied().unwrap_or(false)
    }

    /// Ask every provider whether it is available and record the answers
    pub fn probe(&self) -> Vec<ProviderStatus> {
        for slot in &self.providers {
            let available = slot.provider.check_available();
            self.record(&slot.name, available);
        }
        self.provider_statuses()
    }

    /// Last-known state of every provider, in priority order
    pub fn provider_statuses(&self) -> Vec<ProviderStatus> {
        let availability = self.availability.read();
        self.providers
            .iter()
            .map(|slot| ProviderStatus {
                name: slot.name.clone(),
                kind: slot.provider.kind().to_string(),
                active: availability.get(&slot.name).copied(),
            })
            .collect()
    }

    /// Highest-priority provider that was last seen active
    pub fn active_source(&self) -> Option<String> {
        let availability = self.availability.read();
        self.providers
            .iter()
            .find(|slot| availability.get(&slot.name).copied().unwrap_or(false))
            .map(|slot| slot.name.clone())
    }

    /// Keys that available providers can enumerate, with the provider that
    /// would answer for each
    ///
    /// Values are never returned in bulk.
    pub fn available_keys(&self) -> BTreeMap<String, String> {
        let mut keys = BTreeMap::new();

        for slot in &self.providers {
            if !slot.provider.check_available() {
                self.record(&slot.name, false);
                continue;
            }
            match slot.provider.list_keys() {
                Ok(listed) => {
                    self.record(&slot.name, true);
                    for key in listed {
                        keys.entry(key).or_insert_with(|| slot.name.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!(target: TARGET, provider = %slot.name, error = %e, "could not enumerate keys");
                    self.record(&slot.name, false);
                }
            }
        }
        keys
    }

    /// Forget a cached value so the next call queries providers again
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.cache.invalidate(key);
        if removed {
            tracing::debug!(target: TARGET, key, "invalidated");
        }
        removed
    }

    /// Forget every cached value
    pub fn invalidate_all(&self) {
        self.cache.clear();
        tracing::debug!(target: TARGET, "cache cleared");
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Registered provider names, in priority order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Async resolve a key (non-blocking for tokio hosts)
    ///
    /// Cache hits return immediately; anything that may reach a provider
    /// runs on the blocking pool.
    pub async fn resolve_async(self: &Arc<Self>, key: &str) -> ResolveResult<String> {
        validate_key(key)?;
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit.value().to_string());
        }

        let resolver = Arc::clone(self);
        let owned = key.to_string();
        match tokio::task::spawn_blocking(move || resolver.resolve(&owned)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Runtime is shutting down
            Err(_) => Err(ResolveError::missing(key)),
        }
    }

    /// Async batch resolution on the blocking pool
    pub async fn resolve_all_async(self: &Arc<Self>, keys: Vec<String>) -> BatchResolution {
        let resolver = Arc::clone(self);
        let requested = keys.clone();
        match tokio::task::spawn_blocking(move || resolver.resolve_all(keys.as_slice())).await {
            Ok(batch) => batch,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Runtime is shutting down
            Err(_) => BatchResolution::all_missing(requested.as_slice()),
        }
    }

    fn query_providers(&self, key: &str) -> ResolveResult<ResolvedValue> {
        for slot in &self.providers {
            if !slot.provider.check_available() {
                tracing::debug!(target: TARGET, key, provider = %slot.name, "skipping unavailable provider");
                self.record(&slot.name, false);
                continue;
            }

            match slot.provider.fetch(key) {
                Ok(Some(value)) => {
                    self.record(&slot.name, true);
                    tracing::debug!(target: TARGET, key, provider = %slot.name, len = value.len(), "resolved");
                    return Ok(self.cache.insert(ResolvedValue::new(key, value, slot.name.clone())));
                }
                Ok(None) => {
                    self.record(&slot.name, true);
                    tracing::trace!(target: TARGET, key, provider = %slot.name, "not found, trying next provider");
                }
                Err(e) if e.is_not_found() => {
                    self.record(&slot.name, true);
                }
                Err(e) => {
                    self.record(&slot.name, false);
                    tracing::warn!(
                        target: TARGET,
                        key,
                        provider = %slot.name,
                        error = %e,
                        "provider failed, falling back"
                    );
                }
            }
        }

        tracing::warn!(target: TARGET, key, "not found in any provider");
        Err(ResolveError::missing(key))
    }

    fn record(&self, name: &str, available: bool) {
        let previous = self.availability.write().insert(name.to_string(), available);
        if previous.is_some() && previous != Some(available) {
            tracing::info!(target: TARGET, provider = name, available, "provider availability changed");
        }
    }

    fn gate(&self, key: &str) -> Arc<Gate> {
        let mut gates = self.gates.lock();
        Arc::clone(gates.entry(key.to_string()).or_default())
    }

    fn release_gate(&self, key: &str, gate: Arc<Gate>) {
        let mut gates = self.gates.lock();
        drop(gate);
        // Only the map still holds it: nobody else joined this pass
        if gates.get(key).is_some_and(|g| Arc::strong_count(g) == 1) {
            gates.remove(key);
        }
    }
}

impl std::fmt::Debug for SecretsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsResolver")
            .field("providers", &self.provider_names())
            .field("cached", &self.cache.len())
            .finish()
    }
}
