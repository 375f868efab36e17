//! Periodic liveness task

use actors::{TaskContext, TaskSystem};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use timers::{TimerExpiry, TimerKind, TimerService};
use tracing::{debug, info, warn};
use types::{MessageKind, TaskId};

pub const HEARTBEAT_TASK: TaskId = TaskId::new(1);

pub fn spawn(system: &Arc<TaskSystem>, timers: &TimerService, period: Duration) -> Result<()> {
    let timers = timers.clone();
    system
        .spawn_task(HEARTBEAT_TASK, "heartbeat", move |ctx| run(ctx, timers, period))
        .context("Failed to spawn heartbeat task")?;
    Ok(())
}

fn run(ctx: TaskContext, timers: TimerService, period: Duration) {
    let timer = match timers.arm(ctx.id(), period, TimerKind::Periodic(period), 0) {
        Ok(timer) => timer,
        Err(e) => {
            warn!(error = %e, "Heartbeat timer could not be armed");
            return;
        }
    };
    info!(%timer, period_ms = period.as_millis() as u64, "Heartbeat armed");

    let mut beats = 0u64;
    loop {
        let envelope = match ctx.receive() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Heartbeat mailbox closed");
                break;
            }
        };
        let kind = envelope.kind();
        if let Some(expiry) = TimerExpiry::from_envelope(&envelope) {
            beats += 1;
            debug!(timer = %expiry.timer, beats, "Heartbeat");
        }
        if let Err(e) = ctx.release(envelope) {
            warn!(error = %e, "Failed to release heartbeat envelope");
        }
        if kind == MessageKind::TERMINATE {
            break;
        }
    }

    timers.disarm(timer);
    info!(beats, "Heartbeat stopped");
}
