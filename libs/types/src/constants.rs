//! Process-wide constants shared by the messaging core and its collaborators.

/// Maximum queued envelopes per task mailbox.
pub const QUEUE_MAX_ELEMENTS: usize = 65_536;

/// Well-known TCP port of the diagnostic message dump.
pub const DIAGNOSTIC_PORT: u16 = 10_007;

/// Maximum concurrent diagnostic dump connections.
pub const MAX_DIAGNOSTIC_CONNECTIONS: usize = 5;

/// Largest payload carried inline in an envelope without a pool slot.
pub const INLINE_PAYLOAD_MAX: usize = 32;

/// Default size classes as `(item_count, item_size)` pairs.
pub const DEFAULT_POOLS: [(usize, usize); 4] = [(4096, 64), (2048, 256), (1024, 1024), (256, 4096)];
