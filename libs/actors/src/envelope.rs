//! Message Envelope Model
//!
//! An [`Envelope`] wraps one payload with its routing header. The header is
//! fixed at construction; the only mutable part is ownership of the payload,
//! which moves out exactly once through [`Envelope::take_payload`]. Whoever
//! takes it (the receiver after processing, or the sender after a failed
//! delivery) is responsible for releasing it.
//!
//! Envelopes are deliberately not `Clone`: broadcast fan-out duplicates the
//! payload explicitly so that every recipient releases its own copy.

use pool::{ItemHandle, PoolAllocator};
use types::{Destination, MessageKind, TaskId, INLINE_PAYLOAD_MAX};

/// Small payload stored inside the envelope itself
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InlinePayload {
    len: u8,
    bytes: [u8; INLINE_PAYLOAD_MAX],
}

impl InlinePayload {
    /// `None` when `data` exceeds [`INLINE_PAYLOAD_MAX`]
    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() > INLINE_PAYLOAD_MAX {
            return None;
        }
        let mut bytes = [0u8; INLINE_PAYLOAD_MAX];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            len: data.len() as u8,
            bytes,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl std::fmt::Debug for InlinePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InlinePayload").field(&self.as_bytes()).finish()
    }
}

/// Payload area of an envelope
#[derive(Debug, PartialEq, Eq)]
pub enum Payload {
    /// Header-only message (timer expiry, terminate)
    Empty,
    Inline(InlinePayload),
    /// Buffer obtained from the pool allocator
    Pooled(ItemHandle),
    /// Heap-owned string field released by dropping
    Text(String),
}

impl Payload {
    /// Inline payload, `None` if `data` is too large to be carried inline
    pub fn inline(data: &[u8]) -> Option<Self> {
        InlinePayload::new(data).map(Payload::Inline)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn pooled_handle(&self) -> Option<ItemHandle> {
        match self {
            Payload::Pooled(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Payload size in bytes; a pooled payload reports its item size
    pub fn len(&self, allocator: &PoolAllocator) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Inline(inline) => inline.as_bytes().len(),
            Payload::Pooled(handle) => allocator.item_size(*handle).unwrap_or(0),
            Payload::Text(text) => text.len(),
        }
    }

    /// Independent copy for another recipient. Pooled payloads get a fresh
    /// slot from the same size class.
    pub(crate) fn duplicate(&self, allocator: &PoolAllocator) -> pool::Result<Self> {
        Ok(match self {
            Payload::Empty => Payload::Empty,
            Payload::Inline(inline) => Payload::Inline(*inline),
            Payload::Pooled(handle) => Payload::Pooled(allocator.duplicate(*handle)?),
            Payload::Text(text) => Payload::Text(text.clone()),
        })
    }

    /// Return a pooled buffer to its pool, stamping `kind` as release tag;
    /// other variants are simply dropped
    pub fn release(self, allocator: &PoolAllocator, kind: MessageKind) -> pool::Result<()> {
        match self {
            Payload::Pooled(handle) => allocator.free(handle, kind.inner()),
            _ => Ok(()),
        }
    }
}

/// Routing-wrapped message unit exchanged between tasks
#[derive(Debug)]
pub struct Envelope {
    kind: MessageKind,
    origin: TaskId,
    destination: Destination,
    payload: Payload,
    owns_payload: bool,
}

impl Envelope {
    /// Envelope owning its payload; the receiver must release it
    pub fn new(
        kind: MessageKind,
        origin: TaskId,
        destination: impl Into<Destination>,
        payload: Payload,
    ) -> Self {
        Self::with_ownership(kind, origin, destination, payload, true)
    }

    /// Envelope that only references its payload; nobody releases it
    /// through this envelope
    pub fn borrowed(
        kind: MessageKind,
        origin: TaskId,
        destination: impl Into<Destination>,
        payload: Payload,
    ) -> Self {
        Self::with_ownership(kind, origin, destination, payload, false)
    }

    fn with_ownership(
        kind: MessageKind,
        origin: TaskId,
        destination: impl Into<Destination>,
        payload: Payload,
        owns_payload: bool,
    ) -> Self {
        Self {
            kind,
            origin,
            destination: destination.into(),
            payload,
            owns_payload,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn origin(&self) -> TaskId {
        self.origin
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn owns_payload(&self) -> bool {
        self.owns_payload
    }

    /// Move the payload out and clear the ownership flag.
    ///
    /// Returns `None` for borrowed envelopes and on every call after the
    /// first.
    pub fn take_payload(&mut self) -> Option<Payload> {
        if !self.owns_payload {
            return None;
        }
        self.owns_payload = false;
        Some(std::mem::replace(&mut self.payload, Payload::Empty))
    }

    /// Copy of this envelope readdressed to `destination`, with its own
    /// payload copy when this envelope owns its payload
    pub(crate) fn fork(&self, destination: TaskId, allocator: &PoolAllocator) -> pool::Result<Self> {
        let payload = if self.owns_payload {
            self.payload.duplicate(allocator)?
        } else {
            self.payload.shallow_copy()
        };
        Ok(Self::with_ownership(
            self.kind,
            self.origin,
            destination,
            payload,
            self.owns_payload,
        ))
    }

    /// Same envelope addressed to a single recipient
    pub(crate) fn readdress(mut self, destination: TaskId) -> Self {
        self.destination = Destination::Task(destination);
        self
    }

    /// Release the payload if still owned, then discard the header
    pub fn release(mut self, allocator: &PoolAllocator) -> pool::Result<()> {
        match self.take_payload() {
            Some(payload) => payload.release(allocator, self.kind),
            None => Ok(()),
        }
    }
}

impl Payload {
    /// Copy of a payload that is not owned; pooled payloads keep the same handle
    fn shallow_copy(&self) -> Self {
        match self {
            Payload::Empty => Payload::Empty,
            Payload::Inline(inline) => Payload::Inline(*inline),
            Payload::Pooled(handle) => Payload::Pooled(*handle),
            Payload::Text(text) => Payload::Text(text.clone()),
        }
    }
}

/// Construct an envelope; `owns_payload == false` yields a borrowed envelope
pub fn new_envelope(
    kind: MessageKind,
    origin: TaskId,
    destination: Destination,
    payload: Payload,
    owns_payload: bool,
) -> Envelope {
    Envelope::with_ownership(kind, origin, destination, payload, owns_payload)
}
