//! Logging for Starchain
//!
//! Ledger components never own a logger. They receive an `Arc<dyn Logger>` and write
//! fire-and-forget messages to it; swapping in [`NoopLogger`] must not change behavior.
//!
//! [`init_logging`] installs the global `tracing` subscriber that [`TracingLogger`]
//! writes into. Binaries call it once; the library never does.

use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sink for ledger log lines.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards every message to `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "starchain", "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _message: &str) {}
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for local runs.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl LogFormat {
    /// Accepts "json" or "pretty" (case-insensitive); anything else is `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_level` when set. Output goes to stderr so stdout
/// stays clean for JSON printed by the CLI. A second call is ignored.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!("logging initialized (format={:?})", format);
    }
}
