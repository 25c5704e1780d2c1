//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::level`]. Installing a
//! subscriber twice is not an error, so embedding applications may install
//! their own first.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global `fmt` subscriber described by `config`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
    }
    installed
}
