//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Environment variable holding the log filter, e.g.
/// `RAINY_ROAD_LOG=rr_pipeline=debug,rr_tasks=info`.
pub const LOG_ENV: &str = "RAINY_ROAD_LOG";

/// Install the global `tracing` subscriber.
///
/// Falls back to `info` when `RAINY_ROAD_LOG` is unset or invalid.
/// Idempotent; later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

        // `try_init` so an embedding application that already installed a
        // subscriber keeps it.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .with(filter)
            .try_init();
    });
}
