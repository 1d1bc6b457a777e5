//! Tracing subscriber for the command line host.
//!
//! The library only emits events; installing a subscriber is the host's
//! call. Output goes to stderr so that tables written to stdout stay clean.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::{Result, SieveError};

/// `RUST_LOG` when set, else the configured directive.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.filter)
            .map_err(|e| SieveError::Config(format!("logging.filter '{}': {}", settings.filter, e))),
    }
}

/// Installs a stderr `fmt` subscriber. Fails if one is already installed.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    fmt()
        .with_env_filter(env_filter(settings)?)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| SieveError::Config(format!("logging already initialized: {}", e)))?;
    tracing::debug!(filter = %settings.filter, "logging initialized");
    Ok(())
}
