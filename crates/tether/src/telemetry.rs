//! Logging setup for hosts embedding the bridge

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::BridgeConfig;

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.log_filter`. Returns `Ok(false)` when a
/// global subscriber was already installed, so hosts may call it more than
/// once.
pub fn init_logging(config: &BridgeConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            anyhow::anyhow!("Invalid log filter {:?}: {}", config.log_filter, e)
        })?,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    Ok(installed)
}
