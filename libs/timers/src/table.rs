//! Timer table
//!
//! Entries are indexed by id, and scheduled entries additionally sit in an
//! ordered set keyed by `(deadline, id)`, so the next expiry is always the
//! first element. An entry that has expired but not yet been dispatched is
//! kept in the id index only; disarming it in that window suppresses the
//! expiry envelope.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use types::{TaskId, TimerId};

/// Expiry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    OneShot,
    Periodic(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    pub id: TimerId,
    pub owner: TaskId,
    pub kind: TimerKind,
    /// Opaque value echoed back in the expiry envelope
    pub user_data: u64,
    pub deadline: Instant,
}

/// Expired entry handed to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub owner: TaskId,
    pub user_data: u64,
    /// Periodic timers stay armed after firing
    pub rearmed: bool,
}

#[derive(Debug, Default)]
pub struct TimerTable {
    entries: BTreeMap<TimerId, TimerEntry>,
    schedule: BTreeSet<(Instant, TimerId)>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: TimerEntry) {
        self.schedule.insert((entry.deadline, entry.id));
        if let Some(previous) = self.entries.insert(entry.id, entry) {
            self.schedule.remove(&(previous.deadline, previous.id));
        }
    }

    /// Remove an entry whether or not it is currently scheduled
    pub fn remove(&mut self, id: TimerId) -> Option<TimerEntry> {
        let entry = self.entries.remove(&id)?;
        self.schedule.remove(&(entry.deadline, id));
        Some(entry)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.first().map(|&(deadline, _)| deadline)
    }

    /// Unschedule every entry due at `now`, in deadline order
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.schedule.first() {
            if deadline > now {
                break;
            }
            self.schedule.pop_first();
            due.push(id);
        }
        due
    }

    /// Complete the expiry of a popped entry: one-shot entries are removed,
    /// periodic ones rescheduled one interval after their previous deadline
    /// (or after `now` if they fell behind). A periodic entry whose next
    /// deadline is not representable fires one last time and is removed.
    /// `None` if the entry was disarmed in the meantime.
    pub fn expire(&mut self, id: TimerId, now: Instant) -> Option<FiredTimer> {
        let entry = self.entries.get(&id).copied()?;
        let next = match entry.kind {
            TimerKind::OneShot => None,
            TimerKind::Periodic(interval) => next_deadline(entry.deadline, now, interval),
        };
        let rearmed = match next {
            Some(deadline) => {
                self.insert(TimerEntry { deadline, ..entry });
                true
            }
            None => {
                self.remove(id);
                false
            }
        };
        Some(FiredTimer {
            id,
            owner: entry.owner,
            user_data: entry.user_data,
            rearmed,
        })
    }

    pub fn get(&self, id: TimerId) -> Option<&TimerEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scheduled(&self) -> usize {
        self.schedule.len()
    }
}

fn next_deadline(previous: Instant, now: Instant, interval: Duration) -> Option<Instant> {
    match previous.checked_add(interval)? {
        deadline if deadline > now => Some(deadline),
        _ => now.checked_add(interval),
    }
}
