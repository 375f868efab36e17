//! Dispatch Core
//!
//! [`TaskSystem`] is the surface every collaborator uses: allocate a buffer,
//! wrap it in an envelope, `send` or `broadcast` it, `receive` from the
//! task's own mailbox, and release the payload afterwards.
//!
//! ## Delivery semantics
//!
//! - Point-to-point sends preserve FIFO order per (sender, destination)
//! - A full mailbox fails immediately and returns the envelope to the caller
//! - Broadcast skips the origin and is best effort: each recipient gets its
//!   own payload copy, failures are counted and never rolled back
//!
//! ## Lock Ordering
//!
//! The registry lock is never held while a pool lock is taken: broadcast
//! snapshots the recipient ids and releases the registry before duplicating
//! payloads. Within a pool, an item lock is taken before the pool state lock.

use crate::catalog::MessageCatalog;
use crate::context::TaskContext;
use crate::envelope::{Envelope, Payload};
use crate::error::{Result, SendError, SendFailure, TaskError};
use crate::fatal::escalate;
use crate::metrics::{SystemMetrics, SystemStats};
use crate::registry::{TaskDescriptor, TaskRegistry};
use crate::shutdown::ShutdownFlag;
use crate::tap::{MessageRecord, MessageTap};

use config::{FatalPolicy, IttiConfig};
use pool::{ItemHandle, PoolAllocator, PoolStatistics};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use types::{Destination, IdGenerator, MessageKind, TaskId, QUEUE_MAX_ELEMENTS};

/// Outcome of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Builder for [`TaskSystem`]
pub struct TaskSystemBuilder {
    allocator: Arc<PoolAllocator>,
    mailbox_capacity: usize,
    fatal_policy: FatalPolicy,
    catalog: MessageCatalog,
    tap: Option<Arc<dyn MessageTap>>,
    shutdown: ShutdownFlag,
}

impl TaskSystemBuilder {
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    pub fn catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn tap(mut self, tap: Arc<dyn MessageTap>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Share an externally created termination flag
    pub fn shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = flag;
        self
    }

    /// Fails only on a zero mailbox capacity
    pub fn build(self) -> Result<Arc<TaskSystem>> {
        if self.mailbox_capacity == 0 {
            return Err(TaskError::ZeroMailboxCapacity);
        }
        info!(
            pools = self.allocator.pool_count(),
            mailbox_capacity = self.mailbox_capacity,
            fatal_policy = ?self.fatal_policy,
            diagnostics_tap = self.tap.is_some(),
            "Task system created"
        );
        Ok(Arc::new(TaskSystem {
            allocator: self.allocator,
            registry: TaskRegistry::new(self.mailbox_capacity),
            catalog: self.catalog,
            metrics: SystemMetrics::default(),
            sequence: IdGenerator::default(),
            shutdown: self.shutdown,
            tap: self.tap,
            fatal_policy: self.fatal_policy,
        }))
    }
}

/// Process-wide messaging context
pub struct TaskSystem {
    allocator: Arc<PoolAllocator>,
    registry: TaskRegistry,
    catalog: MessageCatalog,
    metrics: SystemMetrics,
    /// Sequence numbers of diagnostic records
    sequence: IdGenerator,
    shutdown: ShutdownFlag,
    tap: Option<Arc<dyn MessageTap>>,
    fatal_policy: FatalPolicy,
}

impl TaskSystem {
    pub fn builder(allocator: Arc<PoolAllocator>) -> TaskSystemBuilder {
        TaskSystemBuilder {
            allocator,
            mailbox_capacity: QUEUE_MAX_ELEMENTS,
            fatal_policy: FatalPolicy::default(),
            catalog: MessageCatalog::new(),
            tap: None,
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Declare the configured pools and carry over mailbox and fatal settings
    pub fn from_config(config: &IttiConfig) -> Result<TaskSystemBuilder> {
        let mut allocator = PoolAllocator::create_pools(config.pools.len());
        for spec in &config.pools {
            allocator.add_pool(spec.item_count, spec.item_size)?;
        }
        Ok(Self::builder(Arc::new(allocator))
            .mailbox_capacity(config.mailbox.capacity)
            .fatal_policy(config.fatal_policy))
    }

    pub fn allocator(&self) -> &Arc<PoolAllocator> {
        &self.allocator
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn fatal_policy(&self) -> FatalPolicy {
        self.fatal_policy
    }

    /// Register a task with a fresh mailbox. A duplicate id is fatal.
    pub fn register_task(&self, id: TaskId, name: impl Into<String>) -> Result<Arc<TaskDescriptor>> {
        self.registry.register_task(id, name).map_err(|e| self.escalate_if_fatal(e))
    }

    /// Register a task and run `body` on a dedicated named thread. If the
    /// thread cannot be started the registration is rolled back.
    pub fn spawn_task<F>(self: &Arc<Self>, id: TaskId, name: impl Into<String>, body: F) -> Result<()>
    where
        F: FnOnce(TaskContext) + Send + 'static,
    {
        let descriptor = self.register_task(id, name)?;
        let context = TaskContext::new(id, Arc::clone(self));

        let handle = std::thread::Builder::new()
            .name(descriptor.name().to_string())
            .spawn(move || {
                debug!(task_id = %id, "Task thread started");
                body(context);
                debug!(task_id = %id, "Task thread finished");
            })
            .map_err(|source| {
                error!(task_id = %id, error = %source, "Failed to start task thread");
                self.registry.unregister_task(id);
                TaskError::Spawn { task: id, source }
            })?;

        descriptor.attach_thread(handle);
        self.metrics.record_task_spawned();
        info!(task_id = %id, task_name = %descriptor.name(), "Task started");
        Ok(())
    }

    /// Handle bound to an already registered task
    pub fn context(self: &Arc<Self>, id: TaskId) -> Result<TaskContext> {
        self.registry.get(id)?;
        Ok(TaskContext::new(id, Arc::clone(self)))
    }

    /// Join every spawned task thread; returns how many of them panicked
    pub fn wait_tasks_end(&self) -> usize {
        let current = std::thread::current().id();
        let mut panicked = 0;

        for task in self.registry.tasks() {
            let Some(handle) = task.take_thread() else {
                continue;
            };
            if handle.thread().id() == current {
                warn!(task_id = %task.id(), "Task thread cannot wait for itself");
                task.attach_thread(handle);
                continue;
            }
            if handle.join().is_err() {
                error!(task_id = %task.id(), task_name = %task.name(), "Task thread panicked");
                panicked += 1;
            }
        }

        info!(panicked, "All task threads ended");
        panicked
    }

    pub fn allocate(&self, size: usize, info0: u16, info1: u16) -> Result<ItemHandle> {
        Ok(self.allocator.allocate(size, info0, info1)?)
    }

    /// Return a buffer to its pool; invalid handles are fatal
    pub fn free(&self, handle: ItemHandle, info0: u16) -> Result<()> {
        self.allocator
            .free(handle, info0)
            .map_err(|e| self.escalate_if_fatal(e.into()))
    }

    /// Release the payload of an envelope if it still owns one
    pub fn release_envelope(&self, envelope: Envelope) -> Result<()> {
        envelope
            .release(&self.allocator)
            .map_err(|e| self.escalate_if_fatal(e.into()))
    }

    /// Enqueue on the destination mailbox. On failure the envelope comes
    /// back inside the error.
    pub fn send(&self, envelope: Envelope) -> std::result::Result<(), SendError> {
        match envelope.destination() {
            Destination::Task(target) => self.deliver(target, envelope),
            Destination::Broadcast => {
                self.metrics.record_send_attempt();
                Err(SendError::new(envelope, SendFailure::BroadcastAddress))
            }
        }
    }

    /// Deliver a copy to every registered task except the origin.
    ///
    /// The template is consumed: the last recipient gets it, the others
    /// get duplicates. Undeliverable copies are released here.
    pub fn broadcast(&self, envelope: Envelope) -> BroadcastReport {
        let origin = envelope.origin();
        let kind = envelope.kind();
        let recipients: Vec<TaskId> = self
            .registry
            .ids()
            .into_iter()
            .filter(|&id| id != origin)
            .collect();

        let mut report = BroadcastReport::default();
        let Some((&last, rest)) = recipients.split_last() else {
            debug!(origin = %origin, kind = %kind, "Broadcast without recipients");
            self.discard(envelope);
            self.metrics.record_broadcast(0);
            return report;
        };

        for &target in rest {
            let copy = match envelope.fork(target, &self.allocator) {
                Ok(copy) => copy,
                Err(e) => {
                    warn!(origin = %origin, target = %target, kind = %kind, error = %e, "Broadcast copy failed");
                    report.failed += 1;
                    continue;
                }
            };
            self.tally(&mut report, self.deliver(target, copy));
        }
        let outcome = self.deliver(last, envelope.readdress(last));
        self.tally(&mut report, outcome);

        self.metrics.record_broadcast(report.failed);
        debug!(
            origin = %origin,
            kind = %kind,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }

    /// Broadcast `TERMINATE` and raise the termination flag
    pub fn terminate_tasks(&self, origin: TaskId) -> BroadcastReport {
        self.shutdown.raise();
        info!(origin = %origin, "Terminating all tasks");
        self.broadcast(Envelope::new(
            MessageKind::TERMINATE,
            origin,
            Destination::Broadcast,
            Payload::Empty,
        ))
    }

    /// Block until the task's mailbox yields an envelope
    pub fn receive(&self, id: TaskId) -> Result<Envelope> {
        let task = self.registry.get(id)?;
        task.mailbox().dequeue().map_err(|_| TaskError::MailboxClosed(id))
    }

    /// Non-blocking poll; `Ok(None)` when the mailbox is empty
    pub fn try_receive(&self, id: TaskId) -> Result<Option<Envelope>> {
        let task = self.registry.get(id)?;
        task.mailbox().try_dequeue().map_err(|_| TaskError::MailboxClosed(id))
    }

    pub fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    pub fn request_shutdown(&self) {
        if self.shutdown.raise() {
            info!("Shutdown requested");
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.shutdown.is_raised()
    }

    pub fn stats(&self) -> SystemStats {
        self.metrics.snapshot()
    }

    pub fn pool_statistics(&self) -> PoolStatistics {
        self.allocator.statistics()
    }

    fn deliver(&self, target: TaskId, envelope: Envelope) -> std::result::Result<(), SendError> {
        self.metrics.record_send_attempt();
        let kind = envelope.kind();
        let origin = envelope.origin();

        let Some(task) = self.registry.find(target) else {
            self.metrics.record_unknown_destination();
            warn!(origin = %origin, target = %target, kind = %kind, "Send to unknown task");
            return Err(SendError::new(envelope, SendFailure::UnknownDestination));
        };

        let payload_len = self.tap.as_ref().map(|_| envelope.payload().len(&self.allocator));

        match task.mailbox().enqueue(envelope) {
            Ok(()) => {
                self.metrics.record_delivered(kind == MessageKind::TIMER_EXPIRED);
                debug!(
                    origin = %origin,
                    target = %target,
                    kind = %self.catalog.name(kind),
                    "Envelope delivered"
                );
                // Numbered only once enqueued, so failed sends leave no gaps
                if let (Some(tap), Some(payload_len)) = (&self.tap, payload_len) {
                    tap.record(MessageRecord::new(
                        self.sequence.next_id(),
                        kind,
                        self.catalog.name(kind),
                        origin,
                        Destination::Task(target),
                        payload_len,
                    ));
                }
                Ok(())
            }
            Err(e) => {
                if e.is_backpressure() {
                    self.metrics.record_mailbox_full();
                    warn!(
                        origin = %origin,
                        target = %target,
                        task_name = %task.name(),
                        kind = %kind,
                        "Mailbox full"
                    );
                }
                Err(e)
            }
        }
    }

    fn tally(&self, report: &mut BroadcastReport, outcome: std::result::Result<(), SendError>) {
        match outcome {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                self.discard(e.into_envelope());
            }
        }
    }

    /// Release an envelope the core itself could not deliver
    fn discard(&self, envelope: Envelope) {
        if let Err(e) = self.release_envelope(envelope) {
            error!(error = %e, "Failed to release undelivered envelope");
        }
    }

    fn escalate_if_fatal(&self, err: TaskError) -> TaskError {
        if err.is_fatal() {
            escalate(self.fatal_policy, err)
        } else {
            err
        }
    }
}

impl std::fmt::Debug for TaskSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSystem")
            .field("tasks", &self.registry.len())
            .field("pools", &self.allocator.pool_count())
            .field("terminating", &self.is_terminating())
            .finish()
    }
}
