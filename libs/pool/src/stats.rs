//! Pool statistics snapshots

use std::fmt;

/// Counters of one size class at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub index: usize,
    pub item_size: usize,
    pub capacity: usize,
    /// Items allocated and not yet freed
    pub in_use: usize,
    /// Largest `in_use` ever observed
    pub high_water: usize,
    /// Successful allocations since creation
    pub allocations: u64,
    /// Allocations refused because the pool was empty
    pub exhausted: u64,
}

/// Snapshot of every pool of an allocator, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStatistics {
    pub pools: Vec<PoolStats>,
}

impl PoolStatistics {
    /// Total items outstanding across all pools
    pub fn outstanding(&self) -> usize {
        self.pools.iter().map(|p| p.in_use).sum()
    }

    pub fn pool(&self, index: usize) -> Option<&PoolStats> {
        self.pools.get(index)
    }
}

impl fmt::Display for PoolStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4} {:>9} {:>9} {:>9} {:>10} {:>12} {:>9}",
            "pool", "item_size", "capacity", "in_use", "high_water", "allocations", "exhausted"
        )?;
        for p in &self.pools {
            writeln!(
                f,
                "{:>4} {:>9} {:>9} {:>9} {:>10} {:>12} {:>9}",
                p.index, p.item_size, p.capacity, p.in_use, p.high_water, p.allocations, p.exhausted
            )?;
        }
        write!(f, "outstanding: {}", self.outstanding())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_pool() {
        let stats = PoolStatistics {
            pools: vec![
                PoolStats {
                    index: 0,
                    item_size: 32,
                    capacity: 2,
                    in_use: 1,
                    high_water: 2,
                    allocations: 5,
                    exhausted: 1,
                },
                PoolStats {
                    index: 1,
                    item_size: 256,
                    capacity: 8,
                    in_use: 3,
                    high_water: 3,
                    allocations: 3,
                    exhausted: 0,
                },
            ],
        };

        let text = stats.to_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with("outstanding: 4"));
        assert_eq!(stats.outstanding(), 4);
    }
}
