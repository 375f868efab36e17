//! Dispatcher Error Types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatcherError {
    /// The control thread cannot run without its signal mask
    #[cfg(unix)]
    #[error("Failed to install control signal mask: {0}")]
    SignalMask(#[source] nix::Error),

    #[cfg(unix)]
    #[error("Signal wait failed: {0}")]
    SignalWait(#[source] nix::Error),

    #[error("Failed to start {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Control event channel closed before shutdown")]
    ChannelClosed,

    #[error("Periodic timer interval must be non-zero (got {0:?})")]
    ZeroInterval(Duration),

    /// The deadline (or a periodic re-arm) is not representable as an `Instant`
    #[error("Timer delay {0:?} overflows the monotonic clock")]
    DelayOverflow(Duration),

    #[error("Control thread panicked")]
    Panicked,
}

pub type Result<T> = std::result::Result<T, DispatcherError>;

impl DispatcherError {
    /// OS interaction failures abort startup or the control loop
    pub fn is_os_error(&self) -> bool {
        #[cfg(unix)]
        {
            if matches!(self, DispatcherError::SignalMask(_) | DispatcherError::SignalWait(_)) {
                return true;
            }
        }
        matches!(self, DispatcherError::Spawn { .. })
    }
}
