//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; applications embedding it call
//! [`init_tracing`] once at startup (or install their own subscriber).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive, e.g. `geoportal=debug`
pub const LOG_FILTER_ENV: &str = "GEOPORTAL_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber
///
/// The filter comes from `GEOPORTAL_LOG` (default `info`); an unparsable
/// directive falls back to the default. Does nothing if a global subscriber
/// is already installed.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt;

    let directive = std::env::var(LOG_FILTER_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = if json {
        fmt::fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt::fmt().with_env_filter(filter).try_init()
    };
    drop(result);
}
