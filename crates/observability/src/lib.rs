//! Process-wide tracing setup for the help desk binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, init_with};

/// Initialize tracing from the environment.
///
/// `RUST_LOG` sets the filter (default `info`); `NESK_LOG_FORMAT=pretty`
/// switches from JSON lines to human-readable output. Safe to call more than
/// once; later calls are no-ops.
pub fn init() {
    let format = std::env::var("NESK_LOG_FORMAT")
        .map(|raw| LogFormat::parse(&raw))
        .unwrap_or_default();
    init_with(format);
}
