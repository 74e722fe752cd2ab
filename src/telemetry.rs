//! Process-wide tracing setup

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Only the first
/// call has any effect.
pub fn init_tracing(default_filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // Another subscriber may already be installed by the host application
        if fmt().with_env_filter(filter).try_init().is_ok() {
            tracing::info!("Ledger tracing initialized.");
        }
    });
}
