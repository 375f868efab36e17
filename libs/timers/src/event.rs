//! Synthetic control events
//!
//! Everything asynchronous (timer expiry, OS signals) reaches the dispatcher
//! as one of these, through a single channel.

use std::fmt;
use types::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    TimerFired(TimerId),
    ShutdownRequested,
    /// Fault signal (segmentation fault, abort, bus error)
    Fault { signal: i32 },
    /// Interactive interrupt; terminates every task
    Interrupt,
    Unrecognized(i32),
}

impl ControlEvent {
    /// Events after which the signal source has nothing left to report
    pub fn ends_signal_stream(&self) -> bool {
        matches!(self, ControlEvent::ShutdownRequested | ControlEvent::Interrupt)
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlEvent::TimerFired(id) => write!(f, "timer fired ({id})"),
            ControlEvent::ShutdownRequested => write!(f, "shutdown requested"),
            ControlEvent::Fault { signal } => write!(f, "fault (signal {signal})"),
            ControlEvent::Interrupt => write!(f, "interrupt"),
            ControlEvent::Unrecognized(signal) => write!(f, "unrecognized signal {signal}"),
        }
    }
}
