//! Tracing setup for logwarden-daemon.
//!
//! The subscriber is built from the `[general]` config section. The
//! `RUST_LOG` environment variable, when set, wins over the configured
//! level so operators can raise verbosity without editing the file.

use anyhow::{Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logwarden_core::config::GeneralConfig;

/// Install the global tracing subscriber.
///
/// Call once at startup, before the first tracing macro fires.
/// `log_format` selects between `"json"` (machine-parseable lines)
/// and `"pretty"` (human-readable, for development).
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match config.log_format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        other => bail!("unknown log format '{}', expected 'json' or 'pretty'", other),
    };

    init_result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
