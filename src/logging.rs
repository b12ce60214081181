//! Diagnostic logging setup.
//!
//! Everything goes to stderr so `--format json` and `--format csv` output on
//! stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PROFITLENS_LOG";

/// Install the global subscriber. `default_level` (from config) applies
/// when neither `PROFITLENS_LOG` nor `RUST_LOG` is set. Safe to call more
/// than once; later calls are no-ops.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| directive(default_level))
}

/// Build a filter from a configured level, falling back to `info` when the
/// value is not a valid directive.
fn directive(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
}
