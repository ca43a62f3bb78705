//! Subscriber setup for the `fleet` binary.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.  Log lines go to stderr so stdout stays parseable.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (tests) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}
