//! Unix signal adapter
//!
//! Translates OS signals into [`ControlEvent`]s. Signals are never handled
//! asynchronously: [`install_signal_mask`] blocks them in the calling thread
//! (and every thread it spawns afterwards), and one adapter thread retrieves
//! them synchronously with `sigwait`.
//!
//! | Signal | Event |
//! |--------|-------|
//! | `SIGUSR1`, `SIGTERM` | `ShutdownRequested` |
//! | `SIGSEGV`, `SIGABRT`, `SIGBUS` | `Fault` |
//! | `SIGINT` | `Interrupt` |
//!
//! Call [`install_signal_mask`] from the main thread before any task thread
//! is spawned, otherwise threads without the mask receive the signals with
//! default dispositions.

use crate::error::{DispatcherError, Result};
use crate::event::ControlEvent;
use crossbeam_channel::Sender;
use nix::sys::pthread::{pthread_kill, pthread_self, Pthread};
use nix::sys::signal::{SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Signal used to ask for an orderly shutdown
pub const SHUTDOWN_SIGNAL: Signal = Signal::SIGUSR1;

const CONTROL_SIGNALS: [Signal; 6] = [
    Signal::SIGUSR1,
    Signal::SIGTERM,
    Signal::SIGSEGV,
    Signal::SIGABRT,
    Signal::SIGBUS,
    Signal::SIGINT,
];

pub fn control_signal_set() -> SigSet {
    let mut set = SigSet::empty();
    for signal in CONTROL_SIGNALS {
        set.add(signal);
    }
    set
}

/// Block the control signals in the calling thread
pub fn install_signal_mask() -> Result<SigSet> {
    let set = control_signal_set();
    set.thread_block().map_err(|e| {
        error!(error = %e, "Failed to install control signal mask");
        DispatcherError::SignalMask(e)
    })?;
    info!(signals = ?CONTROL_SIGNALS, "Control signal mask installed");
    Ok(set)
}

pub fn translate(signal: Signal) -> ControlEvent {
    match signal {
        Signal::SIGUSR1 | Signal::SIGTERM => ControlEvent::ShutdownRequested,
        Signal::SIGSEGV | Signal::SIGABRT | Signal::SIGBUS => ControlEvent::Fault {
            signal: signal as i32,
        },
        Signal::SIGINT => ControlEvent::Interrupt,
        other => ControlEvent::Unrecognized(other as i32),
    }
}

/// Thread waiting synchronously for control signals
#[derive(Debug)]
pub struct SignalAdapter {
    thread: Option<JoinHandle<Result<()>>>,
    pthread: Pthread,
    stopping: Arc<AtomicBool>,
}

impl SignalAdapter {
    /// Spawn the adapter. The calling thread must already have the control
    /// signals blocked (see [`install_signal_mask`]).
    pub fn spawn(events: Sender<ControlEvent>) -> Result<Self> {
        let stopping = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let flag = Arc::clone(&stopping);
        let thread = std::thread::Builder::new()
            .name("itti-signals".to_string())
            .spawn(move || {
                let _ = ready_tx.send(pthread_self());
                wait_loop(&events, &flag)
            })
            .map_err(|source| DispatcherError::Spawn {
                thread: "signal adapter",
                source,
            })?;

        let pthread = ready_rx.recv().map_err(|_| DispatcherError::ChannelClosed)?;
        Ok(Self {
            thread: Some(thread),
            pthread,
            stopping,
        })
    }

    /// Wake the adapter out of `sigwait` and join it
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        if !thread.is_finished() {
            self.stopping.store(true, Ordering::SeqCst);
            if let Err(e) = pthread_kill(self.pthread, SHUTDOWN_SIGNAL) {
                debug!(error = %e, "Signal adapter already gone");
            }
        }
        thread.join().map_err(|_| DispatcherError::Panicked)?
    }
}

impl Drop for SignalAdapter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "Signal adapter ended with error");
        }
    }
}

fn wait_loop(events: &Sender<ControlEvent>, stopping: &AtomicBool) -> Result<()> {
    let set = control_signal_set();
    // sigwait requires the set to be blocked in this thread
    set.thread_block().map_err(DispatcherError::SignalMask)?;
    info!("Signal adapter waiting for control signals");

    loop {
        let signal = set.wait().map_err(|e| {
            error!(error = %e, "sigwait failed");
            DispatcherError::SignalWait(e)
        })?;

        if stopping.load(Ordering::SeqCst) {
            debug!(?signal, "Signal adapter stopping");
            return Ok(());
        }

        let event = translate(signal);
        debug!(?signal, %event, "Control signal received");
        if events.send(event).is_err() {
            debug!("Control channel closed, signal adapter exiting");
            return Ok(());
        }
        if event.ends_signal_stream() {
            return Ok(());
        }
    }
}
