//! Tracing subscriber setup for Ember binaries and tests.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,ember_assets=debug";

/// Install the global fmt subscriber, honouring `RUST_LOG` when present.
///
/// Returns `false` if a global subscriber was already installed, which makes it
/// safe to call from every test.
pub fn init() -> bool {
    init_with_filter(DEFAULT_FILTER)
}

/// Install the global fmt subscriber with an explicit fallback filter.
pub fn init_with_filter(filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
