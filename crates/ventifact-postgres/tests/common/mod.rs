//! Shared test-only tracing init, mirroring `sem_os_server`'s
//! `tracing_subscriber::fmt().with_env_filter(...)` startup convention so
//! integration tests surface the same `tracing::info!`/`tracing::warn!`
//! output the adapters emit (row counts, cutoffs, watermarks, retries).

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing_subscriber` fmt layer once per test binary, driven by
/// `RUST_LOG` (defaulting to `info` for this crate). Safe to call from every
/// test function; subsequent calls are no-ops.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}
