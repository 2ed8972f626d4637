//! Opt-in logging setup for applications embedding the client
//!
//! The library itself only emits `tracing` events and never installs a
//! subscriber. Applications that want the events printed can call
//! [`init_logging`] once at startup, or hand a [`tracing::Dispatch`] to a
//! single client through [`ClientConfigBuilder::log_dispatch`](crate::ClientConfigBuilder::log_dispatch)
//! (see [`dispatch`]).

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output, `info` and above
    Development,
    /// Verbose diagnostics with source locations, `debug` and above
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install a global subscriber for `mode`
///
/// Call once, early, from the application. Never called by the library.
///
/// # Environment Variables
///
/// - `HIKVISION_LOG_LEVEL`: filter directive (error, warn, info, debug, trace,
///   or a full `EnvFilter` expression); falls back to `RUST_LOG`
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::util::SubscriberInitExt;

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            )
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

/// Initialize logging from `HIKVISION_LOG_MODE` (`silent`, `development`, `debug`)
///
/// Defaults to silent when unset or unrecognized.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("HIKVISION_LOG_MODE").as_deref() {
        Ok("development") => LoggingMode::Development,
        Ok("debug") => LoggingMode::Debug,
        _ => LoggingMode::Silent,
    };

    init_logging(mode)
}

/// A stand-alone dispatcher for `mode`, for use as a per-client log sink
///
/// Unlike [`init_logging`] this touches no global state.
pub fn dispatch(mode: LoggingMode) -> tracing::Dispatch {
    match mode {
        LoggingMode::Silent => tracing::Dispatch::none(),
        LoggingMode::Development => tracing::Dispatch::new(
            Registry::default()
                .with(fmt::layer().with_target(false).compact())
                .with(create_env_filter("info")),
        ),
        LoggingMode::Debug => tracing::Dispatch::new(
            Registry::default()
                .with(fmt::layer().pretty().with_file(true).with_line_number(true))
                .with(create_env_filter("debug")),
        ),
    }
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("HIKVISION_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}
