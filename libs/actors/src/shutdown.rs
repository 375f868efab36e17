//! Process-wide termination flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised once on shutdown; clones observe the same flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag; returns `true` for the first caller only
    pub fn raise(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
