//! Tracing initialization
//!
//! Installs the global `tracing` subscriber with an env-filter directive
//! from the engine configuration.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber. Safe to call once per process;
/// subsequent calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
