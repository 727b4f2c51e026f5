//! Tracing setup with a runtime-adjustable level filter.
//!
//! The subscriber is installed once at startup, before configuration is
//! available, seeded from the default logging level. Once the config is
//! loaded [`apply_logging_level`] swaps the filter to the configured
//! level. An explicit `RUST_LOG` wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Installs the global subscriber. Safe to call more than once; only
/// the first call takes effect.
pub fn init_tracing() {
    let default_level = LoggingConfig::default().level;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (reload_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Swaps the active level filter to the configured level.
///
/// A `RUST_LOG` override set in the environment is left in place.
pub fn apply_logging_level(level: &str) {
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    if let Some(handle) = FILTER_HANDLE.get() {
        let _ = handle.modify(|filter| {
            *filter = EnvFilter::new(level);
        });
    }
}
