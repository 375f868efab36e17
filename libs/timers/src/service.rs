//! Timer arm/disarm service and its scheduler thread
//!
//! The scheduler thread sleeps on a condition variable until the earliest
//! deadline, then emits one [`ControlEvent::TimerFired`] per due timer. It
//! never sends envelopes itself; the dispatcher completes each expiry.

use crate::error::{DispatcherError, Result};
use crate::event::ControlEvent;
use crate::table::{FiredTimer, TimerEntry, TimerKind, TimerTable};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::{IdGenerator, TaskId, TimerId};

#[derive(Debug, Default)]
struct SchedulerState {
    table: TimerTable,
    stopped: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SchedulerState>,
    wake: Condvar,
    ids: IdGenerator,
}

/// Handle to the process-wide timer table; clones share it
#[derive(Debug, Clone, Default)]
pub struct TimerService {
    shared: Arc<Shared>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `owner`, first expiring after `delay`
    pub fn arm(&self, owner: TaskId, delay: Duration, kind: TimerKind, user_data: u64) -> Result<TimerId> {
        if let TimerKind::Periodic(interval) = kind {
            if interval.is_zero() {
                return Err(DispatcherError::ZeroInterval(interval));
            }
        }

        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or(DispatcherError::DelayOverflow(delay))?;
        if let TimerKind::Periodic(interval) = kind {
            if deadline.checked_add(interval).is_none() {
                return Err(DispatcherError::DelayOverflow(interval));
            }
        }

        let id = TimerId::new(self.shared.ids.next_id());
        let entry = TimerEntry {
            id,
            owner,
            kind,
            user_data,
            deadline,
        };

        let mut state = self.shared.state.lock();
        state.table.insert(entry);
        self.shared.wake.notify_one();
        drop(state);

        debug!(timer_id = %id, owner = %owner, ?delay, ?kind, "Timer armed");
        Ok(id)
    }

    /// Cancel a timer; `false` if it already fired (one-shot) or never existed
    pub fn disarm(&self, id: TimerId) -> bool {
        let removed = self.shared.state.lock().table.remove(id).is_some();
        if removed {
            self.shared.wake.notify_one();
            debug!(timer_id = %id, "Timer disarmed");
        }
        removed
    }

    /// Complete the expiry of a fired timer
    pub fn expire(&self, id: TimerId) -> Option<FiredTimer> {
        let mut state = self.shared.state.lock();
        let fired = state.table.expire(id, Instant::now());
        if fired.is_some_and(|f| f.rearmed) {
            self.shared.wake.notify_one();
        }
        fired
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.shared.state.lock().table.get(id).is_some()
    }

    pub fn armed(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    /// Start the scheduler thread feeding `events`
    pub fn spawn_scheduler(&self, events: Sender<ControlEvent>) -> Result<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        std::thread::Builder::new()
            .name("itti-timers".to_string())
            .spawn(move || run_scheduler(&shared, &events))
            .map_err(|source| DispatcherError::Spawn {
                thread: "timer scheduler",
                source,
            })
    }

    /// Stop the scheduler thread; armed timers no longer fire
    pub fn stop(&self) {
        self.shared.state.lock().stopped = true;
        self.shared.wake.notify_all();
    }
}

fn run_scheduler(shared: &Shared, events: &Sender<ControlEvent>) {
    info!("Timer scheduler started");
    let mut state = shared.state.lock();

    while !state.stopped {
        let due = state.table.pop_due(Instant::now());
        if !due.is_empty() {
            drop(state);
            for id in due {
                if events.send(ControlEvent::TimerFired(id)).is_err() {
                    warn!(timer_id = %id, "Control channel closed, timer scheduler exiting");
                    return;
                }
            }
            state = shared.state.lock();
            continue;
        }

        match state.table.next_deadline() {
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
            None => shared.wake.wait(&mut state),
        }
    }

    info!("Timer scheduler stopped");
}
