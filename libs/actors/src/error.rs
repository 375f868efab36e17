//! Task System Error Types

use crate::envelope::Envelope;
use pool::PoolError;
use thiserror::Error;
use types::{Destination, MessageKind, TaskId};

/// Task registry and dispatch core errors
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Unknown task {0}")]
    UnknownTask(TaskId),

    /// Registering an id twice is a contract violation
    #[error("Task {0} is already registered")]
    DuplicateTask(TaskId),

    #[error("{0} is reserved for the messaging core")]
    ReservedTask(TaskId),

    #[error("Mailbox of task {0} is closed")]
    MailboxClosed(TaskId),

    #[error("Failed to start thread for task {task}: {source}")]
    Spawn {
        task: TaskId,
        #[source]
        source: std::io::Error,
    },

    /// A zero-capacity channel would reject every send
    #[error("Mailbox capacity must be non-zero")]
    ZeroMailboxCapacity,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result type alias for task system operations
pub type Result<T> = std::result::Result<T, TaskError>;

impl TaskError {
    pub fn is_fatal(&self) -> bool {
        match self {
            TaskError::DuplicateTask(_) => true,
            TaskError::Pool(e) => e.is_fatal(),
            _ => false,
        }
    }

    pub fn is_backpressure(&self) -> bool {
        matches!(self, TaskError::Pool(e) if e.is_backpressure())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TaskError::UnknownTask(_) => "addressing",
            TaskError::DuplicateTask(_) | TaskError::ReservedTask(_) => "registration",
            TaskError::MailboxClosed(_) | TaskError::Spawn { .. } => "system",
            TaskError::ZeroMailboxCapacity => "configuration",
            TaskError::Pool(e) => e.category(),
        }
    }
}

/// Why an envelope could not be enqueued
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    #[error("mailbox full ({capacity} envelopes)")]
    MailboxFull { capacity: usize },

    #[error("unknown destination task")]
    UnknownDestination,

    #[error("broadcast destination requires broadcast()")]
    BroadcastAddress,

    #[error("mailbox closed")]
    Disconnected,
}

/// Failed delivery; the caller gets the envelope back and keeps ownership
#[derive(Error, Debug)]
#[error("Send of {kind} from {origin} to {destination} failed: {reason}")]
pub struct SendError {
    pub reason: SendFailure,
    kind: MessageKind,
    origin: TaskId,
    destination: Destination,
    envelope: Envelope,
}

impl SendError {
    pub(crate) fn new(envelope: Envelope, reason: SendFailure) -> Self {
        Self {
            reason,
            kind: envelope.kind(),
            origin: envelope.origin(),
            destination: envelope.destination(),
            envelope,
        }
    }

    /// Recover the undelivered envelope to retry or release it
    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn is_backpressure(&self) -> bool {
        matches!(self.reason, SendFailure::MailboxFull { .. })
    }
}
