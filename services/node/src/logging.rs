//! Subscriber installation

use anyhow::{anyhow, Result};
use config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over `override_level`, which wins over the config file
pub fn init(config: &LoggingConfig, override_level: Option<&str>) -> Result<()> {
    let fallback = override_level.unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry.with(fmt::layer().json().with_thread_names(true)).try_init()
    } else {
        registry.with(fmt::layer().with_thread_names(true)).try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
