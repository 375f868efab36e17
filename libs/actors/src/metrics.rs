//! System-wide delivery counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub tasks_spawned: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_delivered: AtomicU64,
    pub mailbox_full_events: AtomicU64,
    pub unknown_destinations: AtomicU64,
    pub broadcasts: AtomicU64,
    pub broadcast_failures: AtomicU64,
    pub timer_envelopes: AtomicU64,
}

impl SystemMetrics {
    pub fn record_send_attempt(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, timer: bool) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
        if timer {
            self.timer_envelopes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record mailbox full event for backpressure monitoring
    pub fn record_mailbox_full(&self) {
        self.mailbox_full_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_destination(&self) {
        self.unknown_destinations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self, failed: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.broadcast_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_task_spawned(&self) {
        self.tasks_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SystemStats {
        SystemStats {
            tasks_spawned: self.tasks_spawned.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            mailbox_full_events: self.mailbox_full_events.load(Ordering::Relaxed),
            unknown_destinations: self.unknown_destinations.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
            timer_envelopes: self.timer_envelopes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SystemMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    pub tasks_spawned: u64,
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub mailbox_full_events: u64,
    pub unknown_destinations: u64,
    pub broadcasts: u64,
    pub broadcast_failures: u64,
    pub timer_envelopes: u64,
}

impl SystemStats {
    /// Send attempts that did not end in a mailbox
    pub fn failed(&self) -> u64 {
        self.messages_sent.saturating_sub(self.messages_delivered)
    }
}
