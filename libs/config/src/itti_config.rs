//! Configuration Loading
//!
//! Loads [`IttiConfig`] from an optional TOML file with `ITTI_` environment
//! overrides (`ITTI_MAILBOX__CAPACITY=1024`, `ITTI_LOGGING__LEVEL=debug`).
//! Every section falls back to its defaults when absent.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct IttiConfig {
    /// Declared size classes, registered in this order
    pub pools: Vec<PoolSpec>,

    pub mailbox: MailboxConfig,

    pub dispatcher: DispatcherConfig,

    pub diagnostics: DiagnosticsConfig,

    pub logging: LoggingConfig,

    /// What the core does on a contract violation
    pub fatal_policy: FatalPolicy,
}

/// One pool size class
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    pub item_count: usize,
    pub item_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MailboxConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Leave the control loop after reporting a fault signal
    pub stop_on_fault: bool,
    /// Block the control signals process-wide and wait on them synchronously
    pub install_signal_mask: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
    pub max_connections: usize,
    /// Records buffered per client before it starts lagging
    pub buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Handling of programming errors (double free, duplicate task id, ...)
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// Log the error with a backtrace and abort the process
    #[default]
    Abort,
    /// Return the typed error to the caller
    Report,
}

impl Default for IttiConfig {
    fn default() -> Self {
        Self {
            pools: types::DEFAULT_POOLS
                .iter()
                .map(|&(item_count, item_size)| PoolSpec { item_count, item_size })
                .collect(),
            mailbox: MailboxConfig::default(),
            dispatcher: DispatcherConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            logging: LoggingConfig::default(),
            fatal_policy: FatalPolicy::default(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: types::QUEUE_MAX_ELEMENTS,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            stop_on_fault: false,
            install_signal_mask: true,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: types::DIAGNOSTIC_PORT,
            max_connections: types::MAX_DIAGNOSTIC_CONNECTIONS,
            buffer: 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl IttiConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (ITTI_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("ITTI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: IttiConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(pools = config.pools.len(), capacity = config.mailbox.capacity, "Configuration loaded");
        Ok(config)
    }

    /// Reject values the core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            bail!("at least one pool must be declared");
        }
        for (index, pool) in self.pools.iter().enumerate() {
            if pool.item_count == 0 || pool.item_size == 0 {
                bail!(
                    "pool #{} has zero item_count or item_size ({} x {})",
                    index,
                    pool.item_count,
                    pool.item_size
                );
            }
        }
        if self.mailbox.capacity == 0 {
            bail!("mailbox.capacity must be non-zero");
        }
        if self.diagnostics.enabled && self.diagnostics.max_connections == 0 {
            bail!("diagnostics.max_connections must be non-zero");
        }
        Ok(())
    }
}
