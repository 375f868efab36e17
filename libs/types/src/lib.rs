//! # ITTI Shared Types
//!
//! Identifiers and constants agreed between every task of the control-plane
//! stack. Task ids and message kinds are small integers drawn from
//! process-wide enumerations; the messaging core treats them as opaque keys.
//!
//! ## Quick Start
//! ```rust
//! use types::{Destination, MessageKind, TaskId};
//!
//! let s1ap = TaskId::new(3);
//! let to = Destination::Task(s1ap);
//! assert_eq!(to.task(), Some(s1ap));
//! assert!(Destination::Broadcast.is_broadcast());
//! assert_eq!(MessageKind::TIMER_EXPIRED.inner(), 1);
//! ```

pub mod constants;
pub mod identifiers;
pub mod id_generator;

pub use constants::*;
pub use id_generator::IdGenerator;
pub use identifiers::{Destination, MessageKind, TaskId, TimerId};
