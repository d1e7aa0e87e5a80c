mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::CountingProvider;
use margadarsaka_core::config::{FileConfig, MemoryConfig, ProviderConfig, ResolverConfig};
use margadarsaka_core::providers::{DefaultValueProvider, Provider};
use margadarsaka_core::{AppSettings, ResolveError, SecretsResolver};

fn chain(providers: &[&Arc<CountingProvider>]) -> SecretsResolver {
    let providers: Vec<Arc<dyn Provider>> = providers
        .iter()
        .map(|p| Arc::clone(*p) as Arc<dyn Provider>)
        .collect();
    SecretsResolver::new(providers)
}

#[test]
fn second_resolution_is_served_from_cache() {
    let vault = Arc::new(CountingProvider::new("vault").with("GEMINI_API_KEY", "gm-1"));
    let resolver = chain(&[&vault]);

    let first = resolver.resolve("GEMINI_API_KEY").unwrap();
    let checks = vault.checks();
    let second = resolver.resolve("GEMINI_API_KEY").unwrap();

    assert_eq!(first, second);
    assert_eq!(vault.fetches(), 1);
    assert_eq!(vault.checks(), checks);
}

#[test]
fn unavailable_primary_falls_through() {
    let vault = Arc::new(CountingProvider::new("vault").with("KEY", "from_vault"));
    vault.set_available(false);
    let file = Arc::new(CountingProvider::new("file").with("KEY", "from_file"));
    let resolver = chain(&[&vault, &file]);

    assert_eq!(resolver.resolve("KEY").unwrap(), "from_file");
    assert!(!resolver.is_provider_active("vault"));
    assert!(resolver.is_provider_active("file"));
    assert_eq!(vault.fetches(), 0);
}

#[test]
fn exhausted_chain_reports_missing_and_retries_later() {
    let env = Arc::new(CountingProvider::new("env"));
    let resolver = chain(&[&env]);

    match resolver.resolve("OPENAI_API_KEY") {
        Err(ResolveError::MissingConfiguration { key }) => assert_eq!(key, "OPENAI_API_KEY"),
        other => panic!("expected missing configuration, got {:?}", other),
    }

    env.set("OPENAI_API_KEY", "sk-late");
    assert_eq!(resolver.resolve("OPENAI_API_KEY").unwrap(), "sk-late");
    assert_eq!(env.fetches(), 2);
}

#[test]
fn batch_reports_partial_results() {
    let env = Arc::new(CountingProvider::new("env").with("A", "valueA").with("C", "valueC"));
    let resolver = chain(&[&env]);

    let batch = resolver.resolve_all(&["A", "B", "C"]);
    assert_eq!(batch.get("A"), Some("valueA"));
    assert_eq!(batch.get("C"), Some("valueC"));
    assert_eq!(batch.missing, vec!["B".to_string()]);
}

#[test]
fn transport_failure_downgrades_to_fallback() {
    let vault = Arc::new(CountingProvider::new("vault").with("SECRET_KEY", "prod-key"));
    vault.set_failing(true);
    let env = Arc::new(CountingProvider::new("env").with("SECRET_KEY", "ci-key"));
    let resolver = chain(&[&vault, &env]);

    let resolved = resolver.resolve_value("SECRET_KEY").unwrap();
    assert_eq!(resolved.value(), "ci-key");
    assert_eq!(resolved.source(), "env");
    assert!(!resolver.is_provider_active("vault"));
}

#[test]
fn racing_first_resolutions_query_once() {
    let vault = Arc::new(
        CountingProvider::new("vault")
            .with("DATABASE_URL", "postgres://prod")
            .slow(Duration::from_millis(40)),
    );
    let resolver = Arc::new(chain(&[&vault]));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver.resolve("DATABASE_URL").unwrap()
            })
        })
        .collect();

    let values: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(values.iter().all(|v| v == "postgres://prod"));
    assert_eq!(vault.fetches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_callers_share_one_query() {
    let vault = Arc::new(
        CountingProvider::new("vault")
            .with("GEMINI_API_KEY", "gm-async")
            .slow(Duration::from_millis(30)),
    );
    let resolver = Arc::new(chain(&[&vault]));

    let lookups = (0..6).map(|_| {
        let resolver = Arc::clone(&resolver);
        async move { resolver.resolve_async("GEMINI_API_KEY").await }
    });
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(|r| r.as_deref() == Ok("gm-async")));
    assert_eq!(vault.fetches(), 1);
}

#[test]
fn config_file_drives_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "# local development\nGEMINI_API_KEY=gm-from-dotenv\nDEBUG=true\n",
    )
    .unwrap();

    let config = ResolverConfig {
        providers: vec![
            ProviderConfig::File(FileConfig {
                path: ".env".into(),
                format: None,
            }),
            // Stands in for the environment so the host's own variables stay out
            ProviderConfig::Memory(MemoryConfig {
                name: Some("ci".to_string()),
                values: [("API_BASE_URL".to_string(), "https://api.staging.example".to_string())]
                    .into_iter()
                    .collect(),
            }),
        ],
        ..Default::default()
    }
    .with_base_dir(dir.path())
    .with_default("ENVIRONMENT", "staging");

    let resolver = SecretsResolver::from_config(&config).unwrap();
    assert_eq!(resolver.provider_names(), vec!["file", "ci", "default"]);

    let settings = AppSettings::load(&resolver).unwrap();
    assert_eq!(settings.gemini_api_key.as_deref(), Some("gm-from-dotenv"));
    assert!(settings.debug);
    assert_eq!(settings.api_base_url, "https://api.staging.example");
    assert_eq!(settings.environment.as_str(), "staging");
    assert!(!settings.vault_active);

    assert_eq!(resolver.resolve_value("ENVIRONMENT").unwrap().source(), "default");
    assert_eq!(resolver.resolve_value("API_BASE_URL").unwrap().source(), "ci");
    assert_eq!(resolver.active_source().as_deref(), Some("file"));
}

#[test]
fn defaults_answer_after_every_provider() {
    let env = Arc::new(CountingProvider::new("env"));
    let defaults = DefaultValueProvider::default().with_default("UI_BASE_URL", "http://localhost:8501");
    let providers: Vec<Arc<dyn Provider>> = vec![env.clone(), Arc::new(defaults)];
    let resolver = SecretsResolver::new(providers);

    assert_eq!(resolver.resolve("UI_BASE_URL").unwrap(), "http://localhost:8501");
    assert_eq!(env.fetches(), 1);
}
