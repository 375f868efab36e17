//! One fixed-item-size pool: slot storage plus an index free list.

use crate::error::{PoolError, Result};
use crate::stats::PoolStats;
use parking_lot::Mutex;

/// Per-slot bookkeeping
#[derive(Debug, Clone, Copy, Default)]
struct SlotMeta {
    generation: u32,
    allocated: bool,
    info: [u16; 2],
}

/// Mutable pool state, guarded by the pool lock
#[derive(Debug)]
struct PoolState {
    /// Stack of free slot indices
    free: Vec<u32>,
    slots: Vec<SlotMeta>,
    in_use: usize,
    high_water: usize,
    allocations: u64,
    exhausted: u64,
}

/// Identically sized slots pre-allocated once at declaration time
#[derive(Debug)]
pub(crate) struct SizeClassPool {
    index: usize,
    item_size: usize,
    capacity: usize,
    state: Mutex<PoolState>,
    items: Box<[Mutex<Box<[u8]>>]>,
}

impl SizeClassPool {
    pub(crate) fn new(index: usize, item_count: usize, item_size: usize) -> Self {
        let items = (0..item_count)
            .map(|_| Mutex::new(vec![0u8; item_size].into_boxed_slice()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            index,
            item_size,
            capacity: item_count,
            state: Mutex::new(PoolState {
                // Reversed so slot 0 is handed out first
                free: (0..item_count as u32).rev().collect(),
                slots: vec![SlotMeta::default(); item_count],
                in_use: 0,
                high_water: 0,
                allocations: 0,
                exhausted: 0,
            }),
            items,
        }
    }

    pub(crate) fn item_size(&self) -> usize {
        self.item_size
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pop a free slot and stamp its tags; `None` when exhausted
    pub(crate) fn pop(&self, info0: u16, info1: u16) -> Option<(u32, u32)> {
        let mut state = self.state.lock();
        let Some(slot) = state.free.pop() else {
            state.exhausted += 1;
            return None;
        };

        let meta = &mut state.slots[slot as usize];
        meta.generation = meta.generation.wrapping_add(1);
        meta.allocated = true;
        meta.info = [info0, info1];
        let generation = meta.generation;

        state.in_use += 1;
        state.high_water = state.high_water.max(state.in_use);
        state.allocations += 1;
        Some((slot, generation))
    }

    /// Return a slot to the free list, stamping the release tag. Waits for
    /// any in-flight access to the slot bytes to finish first.
    pub(crate) fn push(&self, slot: u32, generation: u32, info0: u16) -> Result<()> {
        let _item = self.items.get(slot as usize).map(|item| item.lock());
        let mut state = self.state.lock();
        Self::check(&state, self.index, slot, generation)?;

        let meta = &mut state.slots[slot as usize];
        meta.allocated = false;
        meta.info[0] = info0;

        state.free.push(slot);
        state.in_use -= 1;
        Ok(())
    }

    pub(crate) fn validate(&self, slot: u32, generation: u32) -> Result<()> {
        let state = self.state.lock();
        Self::check(&state, self.index, slot, generation)
    }

    pub(crate) fn set_info(&self, slot: u32, generation: u32, index: usize, value: u16) -> Result<()> {
        if index > 1 {
            return Err(PoolError::InfoIndex(index));
        }
        let mut state = self.state.lock();
        Self::check(&state, self.index, slot, generation)?;
        state.slots[slot as usize].info[index] = value;
        Ok(())
    }

    pub(crate) fn info(&self, slot: u32, generation: u32) -> Result<[u16; 2]> {
        let state = self.state.lock();
        Self::check(&state, self.index, slot, generation)?;
        Ok(state.slots[slot as usize].info)
    }

    /// Run `f` over the slot bytes. The handle is validated with the item
    /// lock held, and `push` takes the same lock, so the slot cannot be
    /// released and handed out again while `f` runs.
    ///
    /// Lock order is item then state.
    pub(crate) fn with_bytes<R>(&self, slot: u32, generation: u32, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let Some(item) = self.items.get(slot as usize) else {
            return Err(PoolError::ForeignHandle {
                pool: self.index,
                slot: slot as usize,
            });
        };
        let mut item = item.lock();
        self.validate(slot, generation)?;
        Ok(f(&mut item))
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            index: self.index,
            item_size: self.item_size,
            capacity: self.capacity,
            in_use: state.in_use,
            high_water: state.high_water,
            allocations: state.allocations,
            exhausted: state.exhausted,
        }
    }

    fn check(state: &PoolState, pool: usize, slot: u32, generation: u32) -> Result<()> {
        let Some(meta) = state.slots.get(slot as usize) else {
            return Err(PoolError::ForeignHandle {
                pool,
                slot: slot as usize,
            });
        };

        match (meta.allocated, meta.generation == generation) {
            (true, true) => Ok(()),
            (false, true) => Err(PoolError::DoubleFree {
                pool,
                slot: slot as usize,
            }),
            _ => Err(PoolError::StaleHandle {
                pool,
                slot: slot as usize,
                generation,
            }),
        }
    }
}
