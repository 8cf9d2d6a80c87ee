//! Tracing setup shared by binaries and tests.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber with an env-filter.
///
/// `RUST_LOG` wins over the provided default directive. Calling this
/// more than once is harmless — later calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
