//! Item Handles
//!
//! A handle is an index pair `(pool, slot)` plus the slot generation at
//! allocation time and the tag of the allocator that issued it. Every
//! operation re-validates all four, so a handle from another allocator, a
//! handle used after free, or a handle freed twice is detected instead of
//! touching the wrong memory.

use std::fmt;

/// Opaque reference to an allocated pool item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    pub(crate) context: u64,
    pub(crate) pool: u16,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ItemHandle {
    /// Index of the size-class pool the item lives in
    pub fn pool_index(&self) -> usize {
        self.pool as usize
    }

    /// Slot index inside its pool
    pub fn slot_index(&self) -> usize {
        self.slot as usize
    }

    /// Allocation generation of the slot
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}.{}#{}", self.pool, self.slot, self.generation)
    }
}
