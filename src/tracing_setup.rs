//! Logging initialization
//!
//! Console logging via `tracing-subscriber` with an env-filter.
//! Configuration via environment variables:
//! - RUST_LOG: log level filter (default: info)

use tracing_subscriber::EnvFilter;

/// Initialize console logging
///
/// Safe to call more than once: subsequent calls are no-ops.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
