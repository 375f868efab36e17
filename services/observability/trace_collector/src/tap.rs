//! Message tap publishing JSON lines to connected clients

use actors::{MessageRecord, MessageTap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Encodes every delivered envelope as one JSON line and fans it out to
/// all subscribed clients. Records are only encoded while a client is
/// attached.
#[derive(Debug)]
pub struct DiagnosticTap {
    lines: broadcast::Sender<Arc<str>>,
    published: AtomicU64,
}

impl DiagnosticTap {
    pub(crate) fn new(buffer: usize) -> Self {
        let (lines, _) = broadcast::channel(buffer.max(1));
        Self {
            lines,
            published: AtomicU64::new(0),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.lines.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.lines.receiver_count()
    }

    /// Records handed to at least one client
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl MessageTap for DiagnosticTap {
    fn record(&self, record: MessageRecord) {
        if self.lines.receiver_count() == 0 {
            return;
        }
        match serde_json::to_string(&record) {
            Ok(line) => {
                if self.lines.send(Arc::from(line)).is_ok() {
                    self.published.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => debug!(error = %e, sequence = record.sequence, "Failed to encode diagnostic record"),
        }
    }
}
