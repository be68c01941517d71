//! Logging setup for applications embedding call-events
//!
//! The library itself only emits `tracing` events; this module installs a
//! subscriber for binaries that do not bring their own.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose output with thread ids and source locations
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
/// Call this once, before subscribing to any event.
///
/// # Examples
///
/// ```rust,ignore
/// call_events::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `CALL_EVENTS_LOG_LEVEL`: filter directive (e.g. `call_events=debug`)
/// - `RUST_LOG`: used when `CALL_EVENTS_LOG_LEVEL` is not set
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

/// Parse a `CALL_EVENTS_LOG_MODE` value.
///
/// Unset or empty means `Silent`.
pub fn parse_mode(value: Option<&str>) -> Result<LoggingMode, LoggingError> {
    match value.map(str::trim) {
        None | Some("") | Some("silent") => Ok(LoggingMode::Silent),
        Some("development") => Ok(LoggingMode::Development),
        Some("debug") => Ok(LoggingMode::Debug),
        Some(other) => Err(LoggingError::InvalidEnv(format!(
            "CALL_EVENTS_LOG_MODE={other}"
        ))),
    }
}

/// Initialize logging from the `CALL_EVENTS_LOG_MODE` environment variable
///
/// Accepts `silent`, `development` or `debug`; defaults to silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let value = std::env::var("CALL_EVENTS_LOG_MODE").ok();
    init_logging(parse_mode(value.as_deref())?)
}

fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("CALL_EVENTS_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| LoggingError::InvalidEnv(format!("{directives}: {e}")))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
