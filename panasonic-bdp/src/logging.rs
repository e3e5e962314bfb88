//! Logging setup for hosts embedding the player layer
//!
//! The library itself only emits `tracing` events. Hosts that do not bring
//! their own subscriber can install one here.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber; events are dropped
    Silent,
    /// Compact stderr output, `info` by default
    Development,
    /// Verbose output with source locations, `debug` by default
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `BDP_LOG_LEVEL`: override the level (error, warn, info, debug, trace)
///   or give a full filter directive; falls back to `RUST_LOG`
/// - `BDP_LOG_TARGET`: restrict output to one target (e.g. `panasonic_bdp::poller`)
///
/// ```rust,ignore
/// panasonic_bdp::logging::init_logging(LoggingMode::Development)?;
/// ```
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `BDP_LOG_MODE` (silent, development, debug)
///
/// Defaults to Silent when unset; an unknown value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("BDP_LOG_MODE") {
        Err(_) => LoggingMode::Silent,
        Ok(value) => parse_mode(&value)?,
    };
    init_logging(mode)
}

fn parse_mode(value: &str) -> Result<LoggingMode, LoggingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "silent" => Ok(LoggingMode::Silent),
        "development" | "dev" => Ok(LoggingMode::Development),
        "debug" => Ok(LoggingMode::Debug),
        other => Err(LoggingError::InvalidEnv(format!("BDP_LOG_MODE={}", other))),
    }
}

/// Build the filter: `BDP_LOG_LEVEL`, then `RUST_LOG`, then `default_level`,
/// optionally narrowed to `BDP_LOG_TARGET`
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let level = std::env::var("BDP_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());
    let target = std::env::var("BDP_LOG_TARGET").ok();
    build_filter(&level, target.as_deref())
}

fn build_filter(level: &str, target: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directive = match target {
        Some(target) if !target.is_empty() => format!("off,{}={}", target, level),
        _ => level.to_string(),
    };
    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{:?}: {}", directive, e)))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
