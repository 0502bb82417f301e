//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host application. [`init`] is what the bundled binary uses.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "casepulse_client=debug";

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to [`DEFAULT_FILTER`].
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`] with a caller-supplied fallback filter.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
