// File: src/logging.rs
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "STENO_LOG";

const DEFAULT_FILTER: &str = "info";

/// Installs a compact stderr subscriber filtered by `STENO_LOG`.
///
/// Safe to call more than once: later calls leave the first subscriber in
/// place.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(filter_env = LOG_ENV, "logging initialized");
    }
}
