//! # Signal/Timer Dispatcher
//!
//! Turns asynchronous notifications into ordinary envelopes. Timer expiry,
//! shutdown requests, fault signals and interactive interrupts all become
//! [`ControlEvent`]s on one channel; a single control thread runs the
//! [`Dispatcher`] state machine over them and delivers the results through
//! the same mailboxes as inter-task traffic.
//!
//! ```text
//! ┌──────────────┐ TimerFired ┌─────────────┐  TIMER_EXPIRED  ┌──────────┐
//! │ itti-timers  │───────────►│             │────────────────►│ owner    │
//! └──────────────┘            │ itti-control│                 │ mailbox  │
//! ┌──────────────┐ Shutdown/  │ (Dispatcher)│  TERMINATE      └──────────┘
//! │ itti-signals │ Fault/Int  │             │────────────────► all tasks
//! └──────────────┘───────────►└─────────────┘
//! ```
//!
//! Timers live in an ordered table keyed by `(deadline, id)`; a one-shot
//! timer produces exactly one `TIMER_EXPIRED` envelope and none after it is
//! disarmed.

pub mod control;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod service;
#[cfg(unix)]
pub mod signals;
pub mod table;

pub use control::ControlThread;
pub use dispatcher::{Dispatcher, DispatcherState, TimerExpiry};
pub use error::{DispatcherError, Result};
pub use event::ControlEvent;
pub use service::TimerService;
#[cfg(unix)]
pub use signals::{install_signal_mask, SignalAdapter};
pub use table::{FiredTimer, TimerEntry, TimerKind, TimerTable};
