//! Escalation of contract violations
//!
//! Double free, foreign handles and duplicate task ids mean a collaborator
//! broke the contract; under [`FatalPolicy::Abort`] the process stops with a
//! backtrace instead of running on with corrupted bookkeeping.

use config::FatalPolicy;
use std::backtrace::Backtrace;
use tracing::error;

/// Apply `policy` to a fatal error. Returns the error under
/// [`FatalPolicy::Report`]; never returns under [`FatalPolicy::Abort`].
pub fn escalate<E: std::error::Error>(policy: FatalPolicy, err: E) -> E {
    let backtrace = Backtrace::force_capture();
    match policy {
        FatalPolicy::Abort => {
            error!(error = %err, %backtrace, "Fatal contract violation, aborting");
            std::process::abort()
        }
        FatalPolicy::Report => {
            error!(error = %err, %backtrace, "Fatal contract violation");
            err
        }
    }
}
