//! Pool Allocator Error Types

use thiserror::Error;

/// Pool allocator errors
///
/// Split into three classes: configuration errors raised while declaring
/// pools, recoverable exhaustion (backpressure) and fatal contract
/// violations by the caller (double free, foreign or stale handles).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// `add_pool` with a zero count or size
    #[error("Invalid pool declaration: {item_count} items of {item_size} bytes")]
    ZeroSized { item_count: usize, item_size: usize },

    /// All size-class slots of the context are taken
    #[error("Pool context full: {max_pools} pools already declared")]
    ContextFull { max_pools: usize },

    /// Requested size exceeds every declared item size
    #[error("No pool fits {size} bytes (largest item size: {largest})")]
    NoFittingPool { size: usize, largest: usize },

    /// Best-fit pool has no free slot
    #[error("Resource exhausted: pool #{pool} ({item_size} bytes x {capacity}) has no free item")]
    Exhausted {
        pool: usize,
        item_size: usize,
        capacity: usize,
    },

    /// Handle was already released
    #[error("Double free of item {slot} in pool #{pool}")]
    DoubleFree { pool: usize, slot: usize },

    /// Handle does not belong to this context
    #[error("Foreign handle: pool #{pool} slot {slot} is not owned by this allocator")]
    ForeignHandle { pool: usize, slot: usize },

    /// Handle refers to a slot that has since been freed or reused
    #[error("Stale handle: pool #{pool} slot {slot} generation {generation} is no longer allocated")]
    StaleHandle {
        pool: usize,
        slot: usize,
        generation: u32,
    },

    #[error("Info tag index {0} out of range (expected 0 or 1)")]
    InfoIndex(usize),

    #[error("Access of {len} bytes at offset {offset} overflows {item_size}-byte item")]
    OutOfBounds {
        offset: usize,
        len: usize,
        item_size: usize,
    },
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

impl PoolError {
    /// Contract violations that must not be survived
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PoolError::DoubleFree { .. }
                | PoolError::ForeignHandle { .. }
                | PoolError::StaleHandle { .. }
        )
    }

    /// Recoverable exhaustion the caller should apply backpressure on
    pub fn is_backpressure(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            PoolError::ZeroSized { .. } | PoolError::ContextFull { .. } => "configuration",
            PoolError::NoFittingPool { .. } | PoolError::Exhausted { .. } => "resource",
            PoolError::DoubleFree { .. }
            | PoolError::ForeignHandle { .. }
            | PoolError::StaleHandle { .. } => "fatal",
            PoolError::InfoIndex(_) | PoolError::OutOfBounds { .. } => "access",
        }
    }
}
