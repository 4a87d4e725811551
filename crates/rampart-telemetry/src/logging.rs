//! Structured logging to stderr.
//!
//! Compiled configs go to stdout, so logs never do.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A compilation has started.
    pub const COMPILE_STARTED: &str = "compile_started";

    /// Aspects were sorted into dependency layers.
    pub const ASPECTS_LAYERED: &str = "aspects_layered";

    /// A pipeline stage (merge, lint, normalize) finished without new errors.
    pub const STAGE_COMPLETED: &str = "stage_completed";

    /// A pipeline stage reported errors; later stages are skipped.
    pub const STAGE_FAILED: &str = "stage_failed";

    /// The normalized config was written out.
    pub const CONFIG_WRITTEN: &str = "config_written";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros so every event carries its `event` name.
#[macro_export]
macro_rules! log_compile_started {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::COMPILE_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_aspects_layered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ASPECTS_LAYERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_stage_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STAGE_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_stage_failed {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::STAGE_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_config_written {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::CONFIG_WRITTEN,
            $($field)*
        )
    };
}
