//! Signal/Timer Dispatcher
//!
//! Pure state machine run on the control thread. It consumes
//! [`ControlEvent`]s from one channel and turns them into ordinary envelopes,
//! so timer expiry and shutdown reach tasks through their mailboxes like any
//! other message.
//!
//! ```text
//! Idle ──start──► Waiting ──event──► Dispatching ──┬──► Waiting
//!                                                  └──► Terminal
//! ```

use crate::error::{DispatcherError, Result};
use crate::event::ControlEvent;
use crate::service::TimerService;
use actors::{Envelope, Payload, TaskSystem};
use crossbeam_channel::Receiver;
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use types::{Destination, MessageKind, TaskId, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Waiting,
    Dispatching,
    Terminal,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Waiting => "waiting",
            DispatcherState::Dispatching => "dispatching",
            DispatcherState::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// Payload of a `TIMER_EXPIRED` envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpiry {
    pub timer: TimerId,
    pub user_data: u64,
}

impl TimerExpiry {
    pub fn to_payload(self) -> Payload {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.timer.inner().to_le_bytes());
        bytes[8..].copy_from_slice(&self.user_data.to_le_bytes());
        // 16 bytes always fit inline
        Payload::inline(&bytes).unwrap_or(Payload::Empty)
    }

    /// Decode from a received envelope; `None` for any other kind
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        if envelope.kind() != MessageKind::TIMER_EXPIRED {
            return None;
        }
        let Payload::Inline(inline) = envelope.payload() else {
            return None;
        };
        let bytes = inline.as_bytes();
        if bytes.len() != 16 {
            return None;
        }
        let mut timer = [0u8; 8];
        let mut user_data = [0u8; 8];
        timer.copy_from_slice(&bytes[..8]);
        user_data.copy_from_slice(&bytes[8..]);
        Some(Self {
            timer: TimerId::new(u64::from_le_bytes(timer)),
            user_data: u64::from_le_bytes(user_data),
        })
    }
}

pub struct Dispatcher {
    state: DispatcherState,
    system: Arc<TaskSystem>,
    timers: TimerService,
    stop_on_fault: bool,
    faults: u64,
}

impl Dispatcher {
    pub fn new(system: Arc<TaskSystem>, timers: TimerService, stop_on_fault: bool) -> Self {
        Self {
            state: DispatcherState::Idle,
            system,
            timers,
            stop_on_fault,
            faults: 0,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Fault events handled so far
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Idle → Waiting; the event sources must be armed before this
    pub fn start(&mut self) {
        if self.state == DispatcherState::Idle {
            self.transition(DispatcherState::Waiting);
        }
    }

    /// Dispatch one event and return the resulting state
    pub fn handle(&mut self, event: ControlEvent) -> DispatcherState {
        if self.state == DispatcherState::Terminal {
            debug!(%event, "Event after terminal state ignored");
            return self.state;
        }
        self.state = DispatcherState::Dispatching;

        let next = match event {
            ControlEvent::TimerFired(id) => {
                self.deliver_timer(id);
                DispatcherState::Waiting
            }
            ControlEvent::ShutdownRequested => {
                self.system.request_shutdown();
                DispatcherState::Terminal
            }
            ControlEvent::Fault { signal } => self.report_fault(signal),
            ControlEvent::Interrupt => {
                let report = self.system.terminate_tasks(TaskId::CORE);
                info!(
                    delivered = report.delivered,
                    failed = report.failed,
                    "Interrupt: terminate broadcast"
                );
                DispatcherState::Terminal
            }
            ControlEvent::Unrecognized(signal) => {
                warn!(signal, "Unrecognized control signal ignored");
                DispatcherState::Waiting
            }
        };

        self.transition(next);
        next
    }

    /// Consume events until the terminal state is reached
    pub fn run(&mut self, events: &Receiver<ControlEvent>) -> Result<()> {
        self.start();
        while self.state != DispatcherState::Terminal {
            let event = events.recv().map_err(|_| {
                error!("Control event channel closed while waiting");
                DispatcherError::ChannelClosed
            })?;
            self.handle(event);
        }
        Ok(())
    }

    fn deliver_timer(&self, id: TimerId) {
        let Some(fired) = self.timers.expire(id) else {
            debug!(timer_id = %id, "Expiry of disarmed timer dropped");
            return;
        };

        let expiry = TimerExpiry {
            timer: fired.id,
            user_data: fired.user_data,
        };
        let envelope = Envelope::new(
            MessageKind::TIMER_EXPIRED,
            TaskId::CORE,
            fired.owner,
            expiry.to_payload(),
        );

        if let Err(e) = self.system.send(envelope) {
            warn!(timer_id = %id, owner = %fired.owner, reason = %e.reason, "Timer expiry not delivered");
            if let Err(release) = self.system.release_envelope(e.into_envelope()) {
                error!(error = %release, "Failed to release timer envelope");
            }
        }
    }

    fn report_fault(&mut self, signal: i32) -> DispatcherState {
        self.faults += 1;
        let backtrace = Backtrace::force_capture();
        error!(signal, faults = self.faults, %backtrace, "Fault signal captured");

        let payload = Payload::inline(&signal.to_le_bytes()).unwrap_or(Payload::Empty);
        self.system.broadcast(Envelope::new(
            MessageKind::FAULT_REPORTED,
            TaskId::CORE,
            Destination::Broadcast,
            payload,
        ));

        if self.stop_on_fault {
            self.system.request_shutdown();
            DispatcherState::Terminal
        } else {
            DispatcherState::Waiting
        }
    }

    fn transition(&mut self, next: DispatcherState) {
        if next != DispatcherState::Waiting || self.state == DispatcherState::Idle {
            info!(from = %self.state, to = %next, "Dispatcher state change");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TimerKind;
    use config::FatalPolicy;
    use pool::PoolAllocator;
    use std::time::Duration;

    fn system() -> Arc<TaskSystem> {
        let mut allocator = PoolAllocator::create_pools(1);
        allocator.add_pool(4, 64).unwrap();
        let system = TaskSystem::builder(Arc::new(allocator))
            .mailbox_capacity(8)
            .fatal_policy(FatalPolicy::Report)
            .build()
            .unwrap();
        system.register_task(TaskId::new(1), "S1AP").unwrap();
        system.register_task(TaskId::new(2), "NAS").unwrap();
        system
    }

    #[test]
    fn test_timer_fired_delivers_expiry() {
        let system = system();
        let timers = TimerService::new();
        let mut dispatcher = Dispatcher::new(Arc::clone(&system), timers.clone(), false);
        dispatcher.start();

        let id = timers
            .arm(TaskId::new(2), Duration::ZERO, TimerKind::OneShot, 42)
            .unwrap();
        assert_eq!(dispatcher.handle(ControlEvent::TimerFired(id)), DispatcherState::Waiting);

        let envelope = system.receive(TaskId::new(2)).unwrap();
        assert_eq!(envelope.origin(), TaskId::CORE);
        assert_eq!(
            TimerExpiry::from_envelope(&envelope),
            Some(TimerExpiry { timer: id, user_data: 42 })
        );
        assert!(!timers.is_armed(id));

        // A second event for the same one-shot is dropped
        dispatcher.handle(ControlEvent::TimerFired(id));
        assert!(system.try_receive(TaskId::new(2)).unwrap().is_none());
        assert_eq!(system.stats().timer_envelopes, 1);
    }

    #[test]
    fn test_periodic_timer_stays_armed() {
        let system = system();
        let timers = TimerService::new();
        let mut dispatcher = Dispatcher::new(Arc::clone(&system), timers.clone(), false);

        let id = timers
            .arm(TaskId::new(1), Duration::ZERO, TimerKind::Periodic(Duration::from_secs(60)), 7)
            .unwrap();
        dispatcher.handle(ControlEvent::TimerFired(id));
        dispatcher.handle(ControlEvent::TimerFired(id));

        assert!(timers.is_armed(id));
        assert!(system.try_receive(TaskId::new(1)).unwrap().is_some());
        assert!(system.try_receive(TaskId::new(1)).unwrap().is_some());
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let system = system();
        let mut dispatcher = Dispatcher::new(Arc::clone(&system), TimerService::new(), false);
        dispatcher.start();

        assert_eq!(dispatcher.handle(ControlEvent::ShutdownRequested), DispatcherState::Terminal);
        assert!(system.is_terminating());
        assert!(system.try_receive(TaskId::new(1)).unwrap().is_none());

        // Nothing is dispatched after the terminal state
        assert_eq!(dispatcher.handle(ControlEvent::Interrupt), DispatcherState::Terminal);
        assert!(system.try_receive(TaskId::new(1)).unwrap().is_none());
    }

    #[test]
    fn test_interrupt_broadcasts_terminate() {
        let system = system();
        let mut dispatcher = Dispatcher::new(Arc::clone(&system), TimerService::new(), false);

        assert_eq!(dispatcher.handle(ControlEvent::Interrupt), DispatcherState::Terminal);
        assert!(system.is_terminating());
        for id in [1, 2] {
            let envelope = system.receive(TaskId::new(id)).unwrap();
            assert_eq!(envelope.kind(), MessageKind::TERMINATE);
        }
    }

    #[test]
    fn test_fault_returns_to_waiting_unless_stop_on_fault() {
        let system = system();
        let mut resilient = Dispatcher::new(Arc::clone(&system), TimerService::new(), false);
        assert_eq!(resilient.handle(ControlEvent::Fault { signal: 11 }), DispatcherState::Waiting);
        assert_eq!(resilient.faults(), 1);
        assert!(!system.is_terminating());
        assert_eq!(system.receive(TaskId::new(1)).unwrap().kind(), MessageKind::FAULT_REPORTED);

        let mut strict = Dispatcher::new(Arc::clone(&system), TimerService::new(), true);
        assert_eq!(strict.handle(ControlEvent::Fault { signal: 6 }), DispatcherState::Terminal);
        assert!(system.is_terminating());
    }

    #[test]
    fn test_unrecognized_signal_keeps_waiting() {
        let system = system();
        let mut dispatcher = Dispatcher::new(system, TimerService::new(), false);
        dispatcher.start();
        assert_eq!(dispatcher.handle(ControlEvent::Unrecognized(28)), DispatcherState::Waiting);
    }

    #[test]
    fn test_run_stops_at_terminal_event() {
        let system = system();
        let mut dispatcher = Dispatcher::new(system, TimerService::new(), false);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(ControlEvent::Unrecognized(28)).unwrap();
        tx.send(ControlEvent::ShutdownRequested).unwrap();
        tx.send(ControlEvent::Interrupt).unwrap();

        dispatcher.run(&rx).unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Terminal);
        // The event after shutdown was never consumed
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_run_reports_closed_channel() {
        let system = system();
        let mut dispatcher = Dispatcher::new(system, TimerService::new(), false);
        let (tx, rx) = crossbeam_channel::unbounded::<ControlEvent>();
        drop(tx);
        assert!(matches!(dispatcher.run(&rx), Err(DispatcherError::ChannelClosed)));
    }
}
