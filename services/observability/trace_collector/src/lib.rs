//! # Diagnostic Listener
//!
//! Passive export of in-flight messages. External tools attach over TCP
//! (port 10007 by convention) and receive one JSON line per envelope
//! delivered by the dispatch core. This is not part of the message-passing
//! contract: a slow or absent client never slows a sender down.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ MessageRecord ┌───────────────┐ broadcast ┌──────────┐
//! │ TaskSystem   │──────────────►│ DiagnosticTap │──────────►│ client 1 │
//! │ (any thread) │   (sync)      │ (JSON encode) │  channel  │ client 2 │
//! └──────────────┘               └───────────────┘           │ ...      │
//!                                                            └──────────┘
//! ```
//!
//! ## Wire format
//!
//! - First line: greeting object (`service`, `version`, `max_connections`)
//! - Then one [`actors::MessageRecord`] per line
//! - Connections beyond `max_connections` receive a single error line and
//!   are closed
//! - A client that falls more than `buffer` records behind skips the
//!   oldest ones
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::DiagnosticsConfig;
//! use trace_collector::DiagnosticListener;
//!
//! # async fn run() -> Result<(), trace_collector::DiagnosticError> {
//! let listener = DiagnosticListener::new(&DiagnosticsConfig::default());
//! let tap = listener.tap(); // hand to TaskSystem::builder(..).tap(tap)
//! let socket = listener.bind().await?;
//! listener.serve(socket, std::future::pending()).await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod listener;
pub mod tap;

pub use error::{DiagnosticError, Result};
pub use listener::{DiagnosticListener, ListenerStats};
pub use tap::DiagnosticTap;
