//! Tracing subscriber setup: compact console output plus an NDJSON file.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Filter directives (e.g., `mbtest=debug`). Default `info`.
//! - `MBTEST_LOG_DIR`: Log directory (default: `logs/`)
//! - `MBTEST_LOG_FILE`: Log file name (default: `mbtest.jsonl`)
//! - `MBTEST_LOG_CONSOLE`: Set to "0" to disable console output
//!
//! # Log Files
//!
//! Violation diagnostics carry `worker`, `a` and `b` fields:
//!
//! ```bash
//! # Show every violation
//! cat logs/mbtest.jsonl | jq 'select(.level == "ERROR")'
//!
//! # Post-settle rechecks for worker 3
//! cat logs/mbtest.jsonl | jq 'select(.fields.worker == 3 and .level == "WARN")'
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Ensures tracing is only initialized once per process.
static INIT: Once = Once::new();

/// Configuration for tracing setup.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Log file name.
    pub log_file: String,
    /// Enable console output.
    pub console_enabled: bool,
    /// Default log level if `RUST_LOG` is not set.
    pub default_level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file: "mbtest.jsonl".to_string(),
            console_enabled: true,
            default_level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("MBTEST_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Ok(file) = env::var("MBTEST_LOG_FILE") {
            config.log_file = file;
        }

        if env::var("MBTEST_LOG_CONSOLE").is_ok_and(|v| v == "0") {
            config.console_enabled = false;
        }

        config
    }
}

/// Initialize the global subscriber from [`TracingConfig::from_env`].
///
/// Safe to call multiple times; only the first call takes effect. If the log
/// directory cannot be created, only the console layer is installed.
pub fn init_tracing() {
    INIT.call_once(|| setup_tracing(&TracingConfig::from_env()));
}

/// Create an `EnvFilter` from `RUST_LOG` or use the default level.
fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{default_level}")))
}

fn setup_tracing(config: &TracingConfig) {
    // === Console Layer ===
    let console_layer = config.console_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_names(true)
            .with_target(true)
            .with_ansi(true)
            .compact()
            .with_filter(make_filter(config.default_level))
    });

    // === File Layer (NDJSON format) ===
    // One JSON object per line; the appender serializes writes internally.
    let file_layer = match std::fs::create_dir_all(&config.log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(&config.log_dir, &config.log_file);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .json()
                    .with_filter(make_filter(config.default_level)),
            )
        }
        Err(e) => {
            eprintln!(
                "mbtest: cannot create log directory {}: {e}; logging to console only",
                config.log_dir.display()
            );
            None
        }
    };

    // try_init: a test harness or embedding program may already own the global subscriber.
    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
