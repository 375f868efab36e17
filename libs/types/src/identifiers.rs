//! # Typed Identifiers
//!
//! Zero-cost wrappers around the small integers used as task ids, message
//! kinds and timer ids. Distinct types stop a message kind from being passed
//! where a task id is expected:
//!
//! ```rust
//! use types::{MessageKind, TaskId};
//!
//! fn route(_to: TaskId, _kind: MessageKind) {}
//!
//! route(TaskId::new(2), MessageKind::new(7)); // ✅
//! // route(MessageKind::new(7), TaskId::new(2)); // ❌ Compile error!
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by validating identifier constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("identifier must be non-zero")]
    Null,
}

/// Macro for generating typed integer identifiers
///
/// Generates a `#[repr(transparent)]` newtype with conversions, `Display`
/// and transparent serde support.
#[macro_export]
macro_rules! define_typed_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Create a new typed ID
            #[inline(always)]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Create a new typed ID, rejecting zero
            #[inline]
            pub fn new_validated(id: $inner) -> Result<Self, $crate::identifiers::IdError> {
                if id == 0 {
                    return Err($crate::identifiers::IdError::Null);
                }
                Ok(Self(id))
            }

            /// Extract the inner value
            #[inline(always)]
            pub const fn inner(&self) -> $inner {
                self.0
            }

            /// Check if this is a null/zero ID
            #[inline(always)]
            pub const fn is_null(&self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            #[inline(always)]
            fn from(id: $name) -> $inner {
                id.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                <$inner as serde::Deserialize<'de>>::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_typed_id!(
    /// Identifier of a registered task (e.g. S1AP, NAS, GTPV1-U)
    TaskId, u16
);

define_typed_id!(
    /// Message kind, drawn from the process-wide message enumeration
    MessageKind, u16
);

define_typed_id!(
    /// Identifier of an armed timer
    TimerId, u64
);

impl TaskId {
    /// Origin of envelopes emitted by the core itself (timers, terminate).
    /// Never registrable.
    pub const CORE: TaskId = TaskId(0);
}

impl MessageKind {
    /// Synthetic envelope emitted when a timer fires
    pub const TIMER_EXPIRED: MessageKind = MessageKind(1);
    /// Broadcast asking every task to leave its message loop
    pub const TERMINATE: MessageKind = MessageKind(2);
    /// Emitted after a fault signal has been captured
    pub const FAULT_REPORTED: MessageKind = MessageKind(3);
    /// First kind free for collaborator use
    pub const FIRST_USER_KIND: MessageKind = MessageKind(16);

    /// Built-in kinds are emitted by the core itself
    pub const fn is_builtin(&self) -> bool {
        self.0 < Self::FIRST_USER_KIND.0
    }
}

/// Envelope destination: a single task or every registered task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Task(TaskId),
    Broadcast,
}

impl Destination {
    /// Target task, `None` for broadcast
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Destination::Task(id) => Some(*id),
            Destination::Broadcast => None,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Destination::Broadcast)
    }
}

impl From<TaskId> for Destination {
    fn from(id: TaskId) -> Self {
        Destination::Task(id)
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Task(id) => write!(f, "{}", id),
            Destination::Broadcast => write!(f, "broadcast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_id_display() {
        assert_eq!(TaskId::new(4).to_string(), "TaskId(4)");
        assert_eq!(MessageKind::new(7).to_string(), "MessageKind(7)");
        assert_eq!(Destination::Broadcast.to_string(), "broadcast");
    }

    #[test]
    fn test_validated_rejects_null() {
        assert_eq!(TaskId::new_validated(0), Err(IdError::Null));
        assert_eq!(TaskId::new_validated(9).unwrap().inner(), 9);
    }

    #[test]
    fn test_builtin_kinds() {
        assert!(MessageKind::TIMER_EXPIRED.is_builtin());
        assert!(MessageKind::TERMINATE.is_builtin());
        assert!(!MessageKind::new(100).is_builtin());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&TaskId::new(12)).unwrap();
        assert_eq!(json, "12");
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TaskId::new(12));

        let dest = serde_json::to_string(&Destination::Task(TaskId::new(2))).unwrap();
        assert_eq!(dest, r#"{"task":2}"#);
    }

    #[test]
    fn test_destination_accessors() {
        let d: Destination = TaskId::new(5).into();
        assert_eq!(d.task(), Some(TaskId::new(5)));
        assert!(!d.is_broadcast());
        assert_eq!(Destination::Broadcast.task(), None);
    }
}
