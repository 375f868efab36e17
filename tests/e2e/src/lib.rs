//! End-to-end test harness for the messaging core
//!
//! Builds a task system from a list of size classes and task names, with
//! fatal errors reported instead of aborting, and optionally a control
//! thread that leaves the process signal mask alone.

use actors::TaskSystem;
use anyhow::{Context, Result};
use config::{DispatcherConfig, FatalPolicy};
use pool::PoolAllocator;
use std::sync::Arc;
use timers::{ControlThread, TimerService};
use tracing::info;
use types::TaskId;

/// Declarative description of a scenario's core
#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    /// `(item_count, item_size)` in declaration order
    pub pools: Vec<(usize, usize)>,
    pub mailbox_capacity: usize,
    pub tasks: Vec<(u16, &'static str)>,
    pub with_control: bool,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            pools: vec![(16, 64), (8, 256)],
            mailbox_capacity: 64,
            tasks: vec![(1, "task-1"), (2, "task-2")],
            with_control: false,
        }
    }
}

/// A running scenario
pub struct Scenario {
    pub system: Arc<TaskSystem>,
    control: Option<ControlThread>,
}

impl Scenario {
    pub fn start(spec: ScenarioSpec) -> Result<Self> {
        let mut allocator = PoolAllocator::create_pools(spec.pools.len());
        for &(item_count, item_size) in &spec.pools {
            allocator
                .add_pool(item_count, item_size)
                .with_context(|| format!("Failed to add pool {item_count}x{item_size}"))?;
        }

        let system = TaskSystem::builder(Arc::new(allocator))
            .mailbox_capacity(spec.mailbox_capacity)
            .fatal_policy(FatalPolicy::Report)
            .build()?;
        for &(id, name) in &spec.tasks {
            system
                .register_task(TaskId::new(id), name)
                .with_context(|| format!("Failed to register task {id}"))?;
        }

        let control = if spec.with_control {
            let config = DispatcherConfig {
                stop_on_fault: false,
                install_signal_mask: false,
            };
            Some(ControlThread::start(Arc::clone(&system), TimerService::new(), &config)?)
        } else {
            None
        };

        info!(tasks = spec.tasks.len(), control = spec.with_control, "Scenario started");
        Ok(Self { system, control })
    }

    /// Timer service of the control thread, if one was started
    pub fn timers(&self) -> Option<&TimerService> {
        self.control.as_ref().map(ControlThread::timers)
    }

    pub fn outstanding(&self) -> usize {
        self.system.pool_statistics().outstanding()
    }

    /// Stop the control thread and join task threads
    pub fn finish(mut self) -> Result<usize> {
        if let Some(control) = self.control.take() {
            control.request_shutdown()?;
            control.join()?;
        }
        Ok(self.system.wait_tasks_end())
    }
}
