//! `tracing` subscriber setup for binaries, demos and tests.
//!
//! The library itself only emits events. Call one of these once at startup
//! to see them; `RUST_LOG` overrides the fallback filter.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, or `fallback`
/// when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(fallback: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`] but writes through the test harness capture.
pub fn init_test_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter("swarm_engine=debug"))
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        init_test_tracing();
        assert!(!init_test_tracing());
    }
}
