//! Development-time tracing for debugging traversal.
//!
//! Tracing is diagnostics only: it goes to stderr and never replaces the
//! session record written by the outcome store.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Initialize tracing with [`DEFAULT_DIRECTIVE`].
///
/// # Example
/// ```bash
/// RUST_LOG=engine=debug cargo run -p engine -- plan script.json
/// ```
pub fn init() {
    init_with_default(DEFAULT_DIRECTIVE);
}

/// Initialize tracing from `RUST_LOG`, falling back to `default_directive`.
/// Output: stderr, compact format.
pub fn init_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
