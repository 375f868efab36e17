//! ITTI node entry point
//!
//! Loads configuration, blocks the control signals before any other thread
//! exists, builds the task system and runs the control thread until a
//! shutdown or interrupt signal arrives.

mod diagnostics;
mod heartbeat;
mod logging;

use actors::TaskSystem;
use anyhow::{Context, Result};
use clap::Parser;
use config::{FatalPolicy, IttiConfig};
use std::path::PathBuf;
use std::time::Duration;
use timers::{ControlThread, TimerService};
use tracing::{error, info, warn};
use types::TaskId;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Disable the diagnostic listener
    #[arg(long)]
    no_diagnostics: bool,

    /// Run a heartbeat task with this period in milliseconds
    #[arg(long)]
    heartbeat_ms: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = IttiConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.logging, args.log_level.as_deref())?;

    // Threads inherit the mask, so it has to be in place before the first spawn
    #[cfg(unix)]
    {
        if config.dispatcher.install_signal_mask {
            timers::install_signal_mask().context("Failed to block control signals")?;
        }
    }

    info!(
        pools = config.pools.len(),
        mailbox_capacity = config.mailbox.capacity,
        fatal_policy = ?config.fatal_policy,
        "Starting ITTI node"
    );
    if config.fatal_policy == FatalPolicy::Report {
        warn!("Fatal errors are reported instead of aborting");
    }

    let diagnostics = if config.diagnostics.enabled && !args.no_diagnostics {
        Some(diagnostics::DiagnosticsServer::start(&config.diagnostics)?)
    } else {
        info!("Diagnostic listener disabled");
        None
    };

    let mut builder = TaskSystem::from_config(&config).context("Failed to build message pools")?;
    if let Some(server) = &diagnostics {
        builder = builder.tap(server.tap());
    }
    let system = builder.build().context("Invalid task system settings")?;

    let timers = TimerService::new();
    if let Some(period) = args.heartbeat_ms {
        heartbeat::spawn(&system, &timers, Duration::from_millis(period.max(1)))?;
    }

    let control = ControlThread::start(system.clone(), timers, &config.dispatcher)
        .context("Failed to start control thread")?;
    info!(tasks = system.registry().len(), "ITTI node running");

    if let Err(e) = control.join() {
        error!(error = %e, "Control thread ended with an error");
    }

    // Shutdown only raises the flag; tasks blocked in receive need the broadcast
    system.terminate_tasks(TaskId::CORE);
    let panicked = system.wait_tasks_end();
    if panicked > 0 {
        warn!(panicked, "Some task threads panicked");
    }

    if let Some(server) = diagnostics {
        server.stop();
    }

    let stats = system.stats();
    info!(
        sent = stats.messages_sent,
        delivered = stats.messages_delivered,
        failed = stats.failed(),
        "ITTI node stopped"
    );
    info!("Pool statistics:\n{}", system.pool_statistics());

    Ok(())
}
