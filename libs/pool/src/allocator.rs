//! Pool Allocator Context
//!
//! Owns the declared size classes and routes every request to the smallest
//! pool whose item size fits it. Declaration happens through `&mut self`
//! during initialization; once the allocator is shared (`Arc`) the set of
//! pools can no longer change.

use crate::error::{PoolError, Result};
use crate::handle::ItemHandle;
use crate::size_class::SizeClassPool;
use crate::stats::PoolStatistics;
use tracing::{debug, error, info, warn};

/// Allocator context holding up to `max_pools` size classes
#[derive(Debug)]
pub struct PoolAllocator {
    /// Tag stamped into every handle this context issues
    context: u64,
    max_pools: usize,
    /// Pools in registration order
    pools: Vec<SizeClassPool>,
    /// Pool indices sorted by item size, ties in registration order
    by_size: Vec<usize>,
}

impl PoolAllocator {
    /// Create an allocator context sized for `max_pools` size classes
    ///
    /// At most `u16::MAX` pools of at most `u32::MAX` items each are addressable.
    pub fn create_pools(max_pools: usize) -> Self {
        let max_pools = max_pools.min(u16::MAX as usize);
        Self {
            context: rand::random(),
            max_pools,
            pools: Vec::with_capacity(max_pools),
            by_size: Vec::with_capacity(max_pools),
        }
    }

    /// Declare a new size class and return its pool index
    pub fn add_pool(&mut self, item_count: usize, item_size: usize) -> Result<usize> {
        if item_count == 0 || item_size == 0 {
            return Err(PoolError::ZeroSized { item_count, item_size });
        }
        if self.pools.len() >= self.max_pools {
            return Err(PoolError::ContextFull {
                max_pools: self.max_pools,
            });
        }

        let item_count = item_count.min(u32::MAX as usize);
        let index = self.pools.len();
        self.pools.push(SizeClassPool::new(index, item_count, item_size));

        // Stable insertion keeps registration order among equal sizes
        let position = self
            .by_size
            .partition_point(|&i| self.pools[i].item_size() <= item_size);
        self.by_size.insert(position, index);

        info!(pool = index, item_count, item_size, "Pool declared");
        Ok(index)
    }

    /// Allocate an item from the smallest pool whose item size is >= `size`
    ///
    /// Exhaustion of that pool is reported as-is; larger pools are never
    /// used as a fallback.
    pub fn allocate(&self, size: usize, info0: u16, info1: u16) -> Result<ItemHandle> {
        let index = self.best_fit(size)?;
        let pool = &self.pools[index];

        match pool.pop(info0, info1) {
            Some((slot, generation)) => Ok(ItemHandle {
                context: self.context,
                pool: index as u16,
                slot,
                generation,
            }),
            None => {
                warn!(
                    pool = index,
                    item_size = pool.item_size(),
                    capacity = pool.capacity(),
                    requested = size,
                    "Pool exhausted"
                );
                Err(PoolError::Exhausted {
                    pool: index,
                    item_size: pool.item_size(),
                    capacity: pool.capacity(),
                })
            }
        }
    }

    /// Release an item, stamping `info0` as the release tag
    pub fn free(&self, handle: ItemHandle, info0: u16) -> Result<()> {
        let pool = self.owning_pool(&handle)?;
        pool.push(handle.slot, handle.generation, info0).map_err(|e| {
            error!(handle = %handle, error = %e, "Invalid free");
            e
        })?;
        debug!(handle = %handle, "Item freed");
        Ok(())
    }

    /// Update one of the two diagnostic tags
    pub fn set_info(&self, handle: ItemHandle, index: usize, value: u16) -> Result<()> {
        self.owning_pool(&handle)?
            .set_info(handle.slot, handle.generation, index, value)
    }

    /// Current diagnostic tags of an allocated item
    pub fn info(&self, handle: ItemHandle) -> Result<[u16; 2]> {
        self.owning_pool(&handle)?.info(handle.slot, handle.generation)
    }

    /// Item size of the pool the handle belongs to
    pub fn item_size(&self, handle: ItemHandle) -> Result<usize> {
        let pool = self.owning_pool(&handle)?;
        pool.validate(handle.slot, handle.generation)?;
        Ok(pool.item_size())
    }

    /// Read access to the item bytes
    pub fn with_item<R>(&self, handle: ItemHandle, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.owning_pool(&handle)?
            .with_bytes(handle.slot, handle.generation, |bytes| f(bytes))
    }

    /// Write access to the item bytes
    pub fn with_item_mut<R>(&self, handle: ItemHandle, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        self.owning_pool(&handle)?
            .with_bytes(handle.slot, handle.generation, f)
    }

    /// Copy `bytes` into the item starting at `offset`
    pub fn write(&self, handle: ItemHandle, offset: usize, bytes: &[u8]) -> Result<()> {
        self.with_item_mut(handle, |item| {
            let end = offset.checked_add(bytes.len()).filter(|&end| end <= item.len());
            match end {
                Some(end) => {
                    item[offset..end].copy_from_slice(bytes);
                    Ok(())
                }
                None => Err(PoolError::OutOfBounds {
                    offset,
                    len: bytes.len(),
                    item_size: item.len(),
                }),
            }
        })?
    }

    /// Copy of the whole item
    pub fn read(&self, handle: ItemHandle) -> Result<Vec<u8>> {
        self.with_item(handle, |bytes| bytes.to_vec())
    }

    /// Allocate a new item of the same size class and copy the contents and
    /// tags of `handle` into it
    pub fn duplicate(&self, handle: ItemHandle) -> Result<ItemHandle> {
        let [info0, info1] = self.info(handle)?;
        let size = self.item_size(handle)?;
        let copy = self.allocate(size, info0, info1)?;

        let copied = self.with_item(handle, |src| self.with_item_mut(copy, |dst| dst.copy_from_slice(src)));
        match copied {
            Ok(Ok(())) => Ok(copy),
            Ok(Err(e)) | Err(e) => {
                self.free(copy, info0)?;
                Err(e)
            }
        }
    }

    /// Per-pool capacity, usage and high-water snapshot
    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            pools: self.pools.iter().map(|p| p.snapshot()).collect(),
        }
    }

    /// Number of declared pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Largest declared item size (0 when no pool is declared)
    pub fn largest_item_size(&self) -> usize {
        self.by_size
            .last()
            .map(|&i| self.pools[i].item_size())
            .unwrap_or(0)
    }

    fn best_fit(&self, size: usize) -> Result<usize> {
        let position = self
            .by_size
            .partition_point(|&i| self.pools[i].item_size() < size);
        self.by_size.get(position).copied().ok_or_else(|| {
            warn!(size, largest = self.largest_item_size(), "No pool fits request");
            PoolError::NoFittingPool {
                size,
                largest: self.largest_item_size(),
            }
        })
    }

    fn owning_pool(&self, handle: &ItemHandle) -> Result<&SizeClassPool> {
        let pool = self.pools.get(handle.pool as usize);
        match pool {
            Some(pool) if handle.context == self.context => Ok(pool),
            _ => {
                error!(handle = %handle, "Handle not issued by this allocator");
                Err(PoolError::ForeignHandle {
                    pool: handle.pool as usize,
                    slot: handle.slot as usize,
                })
            }
        }
    }
}
