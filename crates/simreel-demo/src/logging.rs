//! Tracing setup for the demo programs

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber; `RUST_LOG` overrides the default `info` level.
///
/// Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
