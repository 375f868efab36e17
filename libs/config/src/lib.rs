//! # ITTI Configuration
//!
//! Centralized configuration for the messaging core: pool size classes,
//! mailbox capacity, dispatcher behaviour, diagnostic listener and logging.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::IttiConfig;
//!
//! // TOML file (optional) layered under ITTI_* environment variables
//! let cfg = IttiConfig::load(None).unwrap();
//! assert!(cfg.mailbox.capacity > 0);
//! ```

pub mod itti_config;

pub use itti_config::{
    DiagnosticsConfig, DispatcherConfig, FatalPolicy, IttiConfig, LoggingConfig, MailboxConfig,
    PoolSpec,
};
