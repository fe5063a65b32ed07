#![forbid(unsafe_code)]

//! Production logging setup.
//!
//! The library only emits `tracing` events. Binaries that want structured
//! JSON output without wiring `tracing-subscriber` themselves can enable the
//! `tracing-json` feature and call [`init_json`] once at startup.
//!
//! Filtering uses the given directives, else `RUST_LOG`, else
//! `bindstore_core=info`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "bindstore_core=info";

fn filter(directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install a global JSON subscriber. Returns `false` if one was already set.
pub fn init_json(directives: Option<&str>) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(directives))
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
