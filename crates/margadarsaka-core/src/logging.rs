//! Log subscriber setup
//!
//! The library only emits `tracing` events. Hosts that want them printed can
//! call [`init`]; embedders with their own subscriber should not.
//!
//! Environment switches:
//! - `MARGADARSAKA_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//! - `RUST_LOG`: full filter directives, wins over the level
//! - `MARGADARSAKA_LOG_FILE`: also append to this file
//! - `MARGADARSAKA_DEBUG=1`: also append to `<temp dir>/margadarsaka-secrets.log`

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Optional file sink in addition to stderr
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

fn parse_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

impl LogConfig {
    /// Read the `MARGADARSAKA_*` switches
    pub fn from_env() -> Self {
        let debug = std::env::var("MARGADARSAKA_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let level = std::env::var("MARGADARSAKA_LOG_LEVEL")
            .ok()
            .and_then(|v| parse_level(&v))
            .unwrap_or(if debug { "debug" } else { "info" });

        let file = std::env::var_os("MARGADARSAKA_LOG_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| debug.then(default_log_path));

        Self {
            level: level.to_string(),
            file,
            ansi: true,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = parse_level(&self.level).unwrap_or("info");
            EnvFilter::new(format!("warn,margadarsaka={}", level))
        })
    }
}

/// Debug log location used by `MARGADARSAKA_DEBUG=1`
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("margadarsaka-secrets.log")
}

/// Install a global fmt subscriber
///
/// Returns `true` if this call installed it. Later calls, or a subscriber
/// installed by someone else, make this a no-op. An unopenable log file is
/// reported on stderr and skipped.
pub fn init(config: LogConfig) -> bool {
    let mut installed = false;
    INSTALLED.get_or_init(|| {
        let file = config.file.as_ref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    eprintln!("margadarsaka: cannot open log file {}: {}", path.display(), e);
                    None
                }
            }
        });

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .compact();
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
        });

        installed = tracing_subscriber::registry()
            .with(config.filter())
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .is_ok();
    });
    installed
}

/// [`init`] with [`LogConfig::from_env`]
pub fn init_from_env() -> bool {
    init(LogConfig::from_env())
}
