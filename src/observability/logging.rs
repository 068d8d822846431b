//! Structured diagnostics logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once per process
//! - Honor the configured filter directive, falling back to `info`
//!
//! Traffic records are not diagnostics; they go through `crate::recorder`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Diagnostics go to stderr so they never mix
/// with traffic records echoed on stdout.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter `{filter}` ({e}), falling back to `info`");
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
