//! Per-task view of the dispatch core

use crate::envelope::{Envelope, Payload};
use crate::error::{Result, SendError};
use crate::system::{BroadcastReport, TaskSystem};
use pool::{ItemHandle, PoolAllocator};
use std::sync::Arc;
use types::{Destination, MessageKind, TaskId};

/// Collaborator contract bound to one task id.
///
/// Handed to task bodies by [`TaskSystem::spawn_task`]; every envelope it
/// creates carries the task's id as origin.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    system: Arc<TaskSystem>,
}

impl TaskContext {
    pub(crate) fn new(id: TaskId, system: Arc<TaskSystem>) -> Self {
        Self { id, system }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn system(&self) -> &Arc<TaskSystem> {
        &self.system
    }

    pub fn allocator(&self) -> &PoolAllocator {
        self.system.allocator()
    }

    pub fn allocate(&self, size: usize, info0: u16, info1: u16) -> Result<ItemHandle> {
        self.system.allocate(size, info0, info1)
    }

    pub fn free(&self, handle: ItemHandle, info0: u16) -> Result<()> {
        self.system.free(handle, info0)
    }

    /// Build an owning envelope from this task and send it
    pub fn send(
        &self,
        destination: TaskId,
        kind: MessageKind,
        payload: Payload,
    ) -> std::result::Result<(), SendError> {
        self.system
            .send(Envelope::new(kind, self.id, destination, payload))
    }

    pub fn broadcast(&self, kind: MessageKind, payload: Payload) -> BroadcastReport {
        self.system
            .broadcast(Envelope::new(kind, self.id, Destination::Broadcast, payload))
    }

    pub fn receive(&self) -> Result<Envelope> {
        self.system.receive(self.id)
    }

    pub fn try_receive(&self) -> Result<Option<Envelope>> {
        self.system.try_receive(self.id)
    }

    pub fn release(&self, envelope: Envelope) -> Result<()> {
        self.system.release_envelope(envelope)
    }

    pub fn is_terminating(&self) -> bool {
        self.system.is_terminating()
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext").field("id", &self.id).finish()
    }
}
