//! Inter-Task Message Passing
//!
//! Envelopes, the task registry with its bounded mailboxes, and the dispatch
//! core (`send`, `broadcast`, `receive`) shared by every task of the
//! control-plane stack. Each task runs on its own OS thread and only ever
//! blocks inside `receive`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  allocate   ┌──────────────┐
//! │  Task S1AP   │────────────►│ PoolAllocator│
//! │              │◄── handle ──│              │
//! └──────┬───────┘             └──────▲───────┘
//!        │ send(Envelope)             │ free
//!        ▼                            │
//! ┌──────────────┐  enqueue   ┌───────┴──────┐
//! │  TaskSystem  │───────────►│  Task NAS    │
//! │  (registry)  │  mailbox   │  receive()   │
//! └──────┬───────┘            └──────────────┘
//!        │ MessageRecord
//!        ▼
//!   MessageTap (diagnostics)
//! ```
//!
//! # Examples
//!
//! ```rust
//! use actors::{Envelope, Payload, TaskSystem};
//! use config::FatalPolicy;
//! use pool::PoolAllocator;
//! use std::sync::Arc;
//! use types::{MessageKind, TaskId};
//!
//! let mut allocator = PoolAllocator::create_pools(1);
//! allocator.add_pool(16, 64).unwrap();
//! let system = TaskSystem::builder(Arc::new(allocator))
//!     .fatal_policy(FatalPolicy::Report)
//!     .build()
//!     .unwrap();
//!
//! let (s1ap, nas) = (TaskId::new(1), TaskId::new(2));
//! system.register_task(s1ap, "S1AP").unwrap();
//! system.register_task(nas, "NAS").unwrap();
//!
//! let buffer = system.allocate(64, 7, 1).unwrap();
//! system
//!     .send(Envelope::new(MessageKind::new(7), s1ap, nas, Payload::Pooled(buffer)))
//!     .unwrap();
//!
//! let envelope = system.receive(nas).unwrap();
//! assert_eq!(envelope.origin(), s1ap);
//! system.release_envelope(envelope).unwrap();
//! assert_eq!(system.pool_statistics().outstanding(), 0);
//! ```

pub mod catalog;
pub mod context;
pub mod envelope;
pub mod error;
pub mod fatal;
pub mod mailbox;
pub mod metrics;
pub mod registry;
pub mod shutdown;
pub mod system;
pub mod tap;

pub use catalog::MessageCatalog;
pub use context::TaskContext;
pub use envelope::{new_envelope, Envelope, InlinePayload, Payload};
pub use error::{Result, SendError, SendFailure, TaskError};
pub use mailbox::Mailbox;
pub use metrics::{SystemMetrics, SystemStats};
pub use registry::{TaskDescriptor, TaskRegistry};
pub use shutdown::ShutdownFlag;
pub use system::{BroadcastReport, TaskSystem, TaskSystemBuilder};
pub use tap::{MessageRecord, MessageTap};
