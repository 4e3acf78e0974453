//! Logging setup for the provider binary.
//!
//! Logs go to **stderr**: stdout carries the handshake line the host parses.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter, e.g. `info`, `glesys_provider=debug`
//!
//! ```bash
//! # trace every API call and every waiter poll
//! RUST_LOG=glesys_provider=debug ./glesys-provider
//! ```

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber with an `info` default.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with `default_level` used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Install the subscriber unless one is already set. Returns whether it was
/// installed; useful in tests.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(default_level: &str) -> impl SubscriberInitExt {
    tracing_subscriber::registry().with(env_filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}
