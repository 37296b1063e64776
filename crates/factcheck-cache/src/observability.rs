//! Process-wide log subscriber for binaries embedding the cache.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber, logging to stderr so stdout stays free
/// for command output.
///
/// `RUST_LOG` takes precedence over `default_level` when it parses. Returns
/// `false` if a subscriber was already installed.
pub fn init_logging(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok()
}
