#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use margadarsaka_core::providers::{Provider, ProviderError, ProviderResult};

/// Provider that records every call and can be told to misbehave
pub struct CountingProvider {
    name: String,
    values: Mutex<HashMap<String, String>>,
    pub available: std::sync::atomic::AtomicBool,
    pub fail_fetch: std::sync::atomic::AtomicBool,
    delay: Duration,
    checks: AtomicUsize,
    fetches: AtomicUsize,
}

impl CountingProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Mutex::new(HashMap::new()),
            available: true.into(),
            fail_fetch: false.into(),
            delay: Duration::ZERO,
            checks: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_fetch.store(failing, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Provider for CountingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_available(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    fn fetch(&self, key: &str) -> ProviderResult<Option<String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ProviderError::unavailable(&self.name, "connection reset"));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn list_keys(&self) -> ProviderResult<Vec<String>> {
        Ok(self.values.lock().unwrap().keys().cloned().collect())
    }
}

/// Minimal HTTP responder imitating the vault API on a loopback port
pub struct FakeVault {
    pub base_url: String,
    pub token: String,
    requests: Arc<AtomicUsize>,
}

impl FakeVault {
    /// Serve `secrets` for `project`/`config`, accepting only `token`
    pub fn start(token: &str, project: &str, config: &str, secrets: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(VaultState {
            token: token.to_string(),
            project: project.to_string(),
            config: config.to_string(),
            secrets: secrets
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        let counter = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    let _ = handle(stream, &state);
                });
            }
        });

        Self {
            base_url,
            token: token.to_string(),
            requests,
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// A loopback URL with nothing listening behind it
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

struct VaultState {
    token: String,
    project: String,
    config: String,
    secrets: HashMap<String, String>,
}

fn handle(stream: TcpStream, state: &VaultState) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let params: HashMap<&str, &str> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();

    let expected = format!("Bearer {}", state.token);
    let (status, body) = if authorization.as_deref() != Some(expected.as_str()) {
        (401, r#"{"messages":["Invalid Auth token"],"success":false}"#.to_string())
    } else if params.get("project") != Some(&state.project.as_str())
        || params.get("config") != Some(&state.config.as_str())
    {
        (404, r#"{"messages":["Could not find requested config"],"success":false}"#.to_string())
    } else if path == "/v3/configs/config/secrets" {
        let secrets: serde_json::Map<String, serde_json::Value> = state
            .secrets
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::json!({ "raw": v, "computed": v })))
            .collect();
        (200, serde_json::json!({ "secrets": secrets, "success": true }).to_string())
    } else if path == "/v3/configs/config/secret" {
        match params.get("name").and_then(|name| state.secrets.get(*name)) {
            Some(value) => (
                200,
                serde_json::json!({
                    "name": params.get("name"),
                    "value": { "raw": value, "computed": value },
                    "success": true,
                })
                .to_string(),
            ),
            None => (404, r#"{"messages":["Could not find requested secret"],"success":false}"#.to_string()),
        }
    } else {
        (404, r#"{"messages":["Not found"],"success":false}"#.to_string())
    };

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        _ => "Not Found",
    };
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )?;
    stream.flush()
}
