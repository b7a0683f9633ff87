//! Tracing subscriber setup for the binaries.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=storefront=trace` - Trace for storefront crates only
//! - `RUST_LOG=reconciliation=error` - Only charged-but-unfulfilled alerts
//! - Default: the configured filter, normally [`DEFAULT_LOG_FILTER`]

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor `STOREFRONT_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,storefront=debug,sqlx=warn";

/// Target for charged-but-unfulfilled events, so they can be routed to alerting.
pub const RECONCILIATION_TARGET: &str = "reconciliation";

/// Installs the global fmt subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
