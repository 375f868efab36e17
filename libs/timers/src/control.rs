//! Control thread wiring
//!
//! Starts the timer scheduler, the optional signal adapter and the
//! dispatcher thread, all connected through one control event channel.

use crate::dispatcher::Dispatcher;
use crate::error::{DispatcherError, Result};
use crate::event::ControlEvent;
use crate::service::TimerService;
use actors::TaskSystem;
use config::DispatcherConfig;
use crossbeam_channel::{unbounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

#[cfg(unix)]
use crate::signals::SignalAdapter;

/// Running control thread and its event sources
#[derive(Debug)]
pub struct ControlThread {
    events: Sender<ControlEvent>,
    timers: TimerService,
    dispatcher: Option<JoinHandle<Result<()>>>,
    scheduler: Option<JoinHandle<()>>,
    #[cfg(unix)]
    signals: Option<SignalAdapter>,
}

impl ControlThread {
    /// Start the control thread for `system`.
    ///
    /// With `install_signal_mask` the control signals are blocked in the
    /// calling thread and a signal adapter feeds them to the dispatcher.
    pub fn start(system: Arc<TaskSystem>, timers: TimerService, config: &DispatcherConfig) -> Result<Self> {
        let (events, receiver) = unbounded();

        #[cfg(unix)]
        let signals = if config.install_signal_mask {
            crate::signals::install_signal_mask()?;
            Some(SignalAdapter::spawn(events.clone())?)
        } else {
            None
        };
        #[cfg(not(unix))]
        {
            if config.install_signal_mask {
                warn!("Signal mask not supported on this platform; only timers and injected events are dispatched");
            }
        }

        let scheduler = timers.spawn_scheduler(events.clone())?;

        let mut dispatcher = Dispatcher::new(system, timers.clone(), config.stop_on_fault);
        let dispatcher = std::thread::Builder::new()
            .name("itti-control".to_string())
            .spawn(move || dispatcher.run(&receiver))
            .map_err(|source| DispatcherError::Spawn {
                thread: "control",
                source,
            })?;

        info!(
            stop_on_fault = config.stop_on_fault,
            signal_mask = config.install_signal_mask,
            "Control thread started"
        );

        Ok(Self {
            events,
            timers,
            dispatcher: Some(dispatcher),
            scheduler: Some(scheduler),
            #[cfg(unix)]
            signals,
        })
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    /// Feed an event as if it came from the OS
    pub fn inject(&self, event: ControlEvent) -> Result<()> {
        self.events.send(event).map_err(|_| DispatcherError::ChannelClosed)
    }

    pub fn request_shutdown(&self) -> Result<()> {
        self.inject(ControlEvent::ShutdownRequested)
    }

    pub fn is_finished(&self) -> bool {
        self.dispatcher.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the dispatcher to reach its terminal state, then stop the
    /// event sources
    pub fn join(mut self) -> Result<()> {
        let outcome = match self.dispatcher.take() {
            Some(thread) => thread.join().map_err(|_| DispatcherError::Panicked).and_then(|r| r),
            None => Ok(()),
        };
        if let Err(e) = &outcome {
            error!(error = %e, "Control thread failed");
        }
        self.stop_sources();
        info!("Control thread stopped");
        outcome
    }

    fn stop_sources(&mut self) {
        self.timers.stop();
        if let Some(scheduler) = self.scheduler.take() {
            if scheduler.join().is_err() {
                error!("Timer scheduler panicked");
            }
        }
        #[cfg(unix)]
        {
            if let Some(signals) = self.signals.take() {
                if let Err(e) = signals.stop() {
                    warn!(error = %e, "Signal adapter stop failed");
                }
            }
        }
    }
}

impl Drop for ControlThread {
    fn drop(&mut self) {
        if self.dispatcher.is_some() {
            // Dropped without join: ask the dispatcher to finish
            let _ = self.events.send(ControlEvent::ShutdownRequested);
            if let Some(thread) = self.dispatcher.take() {
                let _ = thread.join();
            }
        }
        self.stop_sources();
    }
}
