//! # Pool Allocator for Inter-Task Message Buffers
//!
//! ## Purpose
//!
//! Hands out and reclaims fixed-size message buffers without touching the
//! general-purpose allocator on the per-message path. Every slot is
//! allocated once when its pool is declared; afterwards `allocate` and
//! `free` only move slot indices between a free list and their owner.
//!
//! ## Architecture Role
//!
//! ```text
//! Producer task ──allocate(size)──► [Best-fit pool] ──handle──► fill payload
//!                                                                   │
//! Consumer task ◄──────────── Envelope via mailbox ◄────────────────┘
//!       │
//!       └──free(handle)──► slot back on the pool free list
//! ```
//!
//! ## Size Classes
//!
//! Requests are served by the smallest declared pool whose item size is
//! at least the requested size; equal sizes resolve in declaration order.
//! When that pool is empty the request fails with
//! [`PoolError::Exhausted`]: there is no silent fallback to a larger pool,
//! so callers see the backpressure.
//!
//! ## Handles
//!
//! [`ItemHandle`] is an `(allocator, pool, slot, generation)` tuple checked
//! on every access. Double free, use after free and handles from another
//! allocator are reported as fatal errors ([`PoolError::is_fatal`]).
//!
//! ## Performance Profile
//!
//! - **Allocate / free**: O(1), one short per-pool lock
//! - **Memory**: `Σ item_count × item_size`, fixed after initialization
//! - **Contention**: pools are locked independently
//!
//! ## Usage
//!
//! ```rust
//! use pool::PoolAllocator;
//!
//! let mut allocator = PoolAllocator::create_pools(2);
//! allocator.add_pool(16, 64).unwrap();
//! allocator.add_pool(4, 1024).unwrap();
//!
//! let item = allocator.allocate(48, 7, 1).unwrap(); // kind=7, seq=1
//! allocator.write(item, 0, b"attach request").unwrap();
//! assert_eq!(allocator.item_size(item).unwrap(), 64);
//!
//! allocator.free(item, 7).unwrap();
//! assert!(allocator.free(item, 7).unwrap_err().is_fatal());
//! assert_eq!(allocator.statistics().outstanding(), 0);
//! ```

pub mod allocator;
pub mod error;
pub mod handle;
mod size_class;
pub mod stats;

pub use allocator::PoolAllocator;
pub use error::{PoolError, Result};
pub use handle::ItemHandle;
pub use stats::{PoolStatistics, PoolStats};
