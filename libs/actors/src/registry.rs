//! Task Registry
//!
//! Maps task ids to their descriptors. Registration happens at startup;
//! afterwards the registry is only read, so lookups take a shared lock and
//! clone an `Arc` out.

use crate::error::{Result, TaskError};
use crate::mailbox::Mailbox;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};
use types::TaskId;

/// Registered task: identity, mailbox and (once spawned) its thread
pub struct TaskDescriptor {
    id: TaskId,
    name: String,
    mailbox: Mailbox,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TaskDescriptor {
    fn new(id: TaskId, name: String, mailbox_capacity: usize) -> Self {
        Self {
            id,
            name,
            mailbox: Mailbox::new(mailbox_capacity),
            thread: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub(crate) fn attach_thread(&self, handle: JoinHandle<()>) {
        *self.thread.lock() = Some(handle);
    }

    pub(crate) fn take_thread(&self) -> Option<JoinHandle<()>> {
        self.thread.lock().take()
    }

    pub fn has_thread(&self) -> bool {
        self.thread.lock().is_some()
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("queued", &self.mailbox.len())
            .finish()
    }
}

/// Task registry
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: RwLock<BTreeMap<TaskId, Arc<TaskDescriptor>>>,
    mailbox_capacity: usize,
}

impl TaskRegistry {
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(BTreeMap::new()),
            mailbox_capacity,
        }
    }

    /// Create a descriptor with a fresh bounded mailbox
    pub fn register_task(&self, id: TaskId, name: impl Into<String>) -> Result<Arc<TaskDescriptor>> {
        if id == TaskId::CORE {
            return Err(TaskError::ReservedTask(id));
        }

        let mut tasks = self.tasks.write();
        if tasks.contains_key(&id) {
            return Err(TaskError::DuplicateTask(id));
        }

        let descriptor = Arc::new(TaskDescriptor::new(id, name.into(), self.mailbox_capacity));
        tasks.insert(id, Arc::clone(&descriptor));

        info!(
            task_id = %id,
            task_name = %descriptor.name(),
            mailbox_capacity = self.mailbox_capacity,
            "Task registered"
        );
        Ok(descriptor)
    }

    /// Drop a registration; envelopes still queued in its mailbox go with it
    pub fn unregister_task(&self, id: TaskId) -> Option<Arc<TaskDescriptor>> {
        let removed = self.tasks.write().remove(&id);
        if let Some(descriptor) = &removed {
            info!(task_id = %id, task_name = %descriptor.name(), "Task unregistered");
        }
        removed
    }

    pub fn find(&self, id: TaskId) -> Option<Arc<TaskDescriptor>> {
        self.tasks.read().get(&id).cloned()
    }

    /// Descriptor or `UnknownTask`
    pub fn get(&self, id: TaskId) -> Result<Arc<TaskDescriptor>> {
        self.find(id).ok_or_else(|| {
            debug!(task_id = %id, "Lookup of unregistered task");
            TaskError::UnknownTask(id)
        })
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.read().contains_key(&id)
    }

    /// Snapshot of all descriptors in id order
    pub fn tasks(&self) -> Vec<Arc<TaskDescriptor>> {
        self.tasks.read().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }
}
