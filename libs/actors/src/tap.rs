//! Passive export of delivered envelopes
//!
//! The dispatch core reports every successful delivery to an optional
//! [`MessageTap`]. Implementations must not block: they run on the sender's
//! thread.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use types::{Destination, MessageKind, TaskId};

/// One delivered envelope, as seen by diagnostic consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub sequence: u64,
    pub kind: MessageKind,
    pub kind_name: String,
    pub origin: TaskId,
    pub destination: Destination,
    pub payload_len: usize,
    pub timestamp_ns: u64,
}

impl MessageRecord {
    pub fn new(
        sequence: u64,
        kind: MessageKind,
        kind_name: impl Into<String>,
        origin: TaskId,
        destination: Destination,
        payload_len: usize,
    ) -> Self {
        Self {
            sequence,
            kind,
            kind_name: kind_name.into(),
            origin,
            destination,
            payload_len,
            timestamp_ns: now_ns(),
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

pub trait MessageTap: Send + Sync {
    fn record(&self, record: MessageRecord);
}
