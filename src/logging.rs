//! Subscriber setup for `tracing` output.

use crate::config::LoggingSettings;
use crate::error::{AppResult, StimError};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG`, when set, wins over the configured level.
///
/// # Errors
///
/// Returns `StimError::Configuration` if a global subscriber is already
/// installed.
pub fn init(settings: &LoggingSettings) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| StimError::Configuration(format!("Logging already initialized: {}", e)))
}
