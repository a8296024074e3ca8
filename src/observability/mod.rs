//! # Observability
//!
//! Structured logging for the token tooling. Everything goes through
//! `tracing`; the subscriber is installed once per process.

pub mod logging;

pub use logging::log_config_info;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::credentials::{Result, TokenError};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Installing twice is not an
/// error; the first subscriber stays in place.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = log_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    // A subscriber may already be installed (e.g. by a test harness); keep it.
    let _ = if config.json_logging { builder.json().try_init() } else { builder.try_init() };
    Ok(())
}

fn log_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives),
        Err(_) => EnvFilter::try_new(&config.log_level),
    }
    .map_err(|e| TokenError::config_error(format!("Invalid log filter: {}", e)))
}
