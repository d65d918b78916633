//! Logging setup for processes embedding the engine.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the host's choice. These helpers give hosts the same verbosity mapping
//! everywhere.

use crate::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Maps verbosity flags to a maximum log level.
///
/// `quiet` wins over any verbosity; otherwise 0=INFO, 1=DEBUG, 2+=TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes text logging based on verbosity level.
///
/// # Example
/// ```rust,no_run
/// use dbscout_core::logging::init_logging;
///
/// // Show generated SQL and chosen sampling strategies
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    init_logging_with_format(verbose, quiet, LogFormat::Text)
}

/// Initializes logging with an explicit output format.
///
/// `RUST_LOG` directives, when set, refine the level derived from the flags.
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging_with_format(verbose: u8, quiet: bool, format: LogFormat) -> Result<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| {
        crate::error::ScoutError::configuration(format!("Failed to initialize logging: {}", e))
    })
}
