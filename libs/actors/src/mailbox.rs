//! Bounded per-task mailbox
//!
//! Multi-producer, single-consumer FIFO of envelopes. Enqueue never blocks:
//! a full mailbox hands the envelope straight back to the sender.

use crate::envelope::Envelope;
use crate::error::{SendError, SendFailure};
use crossbeam_channel::{bounded, Receiver, RecvError, Sender, TryRecvError, TrySendError};

#[derive(Debug)]
pub struct Mailbox {
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
    capacity: usize,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Envelopes currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub(crate) fn enqueue(&self, envelope: Envelope) -> Result<(), SendError> {
        self.sender.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(envelope) => SendError::new(
                envelope,
                SendFailure::MailboxFull {
                    capacity: self.capacity,
                },
            ),
            TrySendError::Disconnected(envelope) => SendError::new(envelope, SendFailure::Disconnected),
        })
    }

    /// Block until an envelope is available
    pub(crate) fn dequeue(&self) -> Result<Envelope, RecvError> {
        self.receiver.recv()
    }

    /// `Ok(None)` when the mailbox is empty
    pub(crate) fn try_dequeue(&self) -> Result<Option<Envelope>, RecvError> {
        match self.receiver.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Payload;
    use types::{MessageKind, TaskId};

    fn envelope(seq: u16) -> Envelope {
        Envelope::new(MessageKind::new(seq), TaskId::new(1), TaskId::new(2), Payload::Empty)
    }

    #[test]
    fn test_fifo_order() {
        let mailbox = Mailbox::new(8);
        for seq in 1..=5 {
            mailbox.enqueue(envelope(seq)).unwrap();
        }
        let kinds: Vec<u16> = (0..5).map(|_| mailbox.dequeue().unwrap().kind().inner()).collect();
        assert_eq!(kinds, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_full_mailbox_returns_envelope() {
        let mailbox = Mailbox::new(2);
        mailbox.enqueue(envelope(1)).unwrap();
        mailbox.enqueue(envelope(2)).unwrap();

        let err = mailbox.enqueue(envelope(3)).unwrap_err();
        assert_eq!(err.reason, SendFailure::MailboxFull { capacity: 2 });
        assert_eq!(err.into_envelope().kind(), MessageKind::new(3));
        assert_eq!(mailbox.len(), 2);

        // Space frees up, mailbox keeps working
        assert_eq!(mailbox.dequeue().unwrap().kind(), MessageKind::new(1));
        mailbox.enqueue(envelope(4)).unwrap();
        assert_eq!(mailbox.dequeue().unwrap().kind(), MessageKind::new(2));
        assert_eq!(mailbox.dequeue().unwrap().kind(), MessageKind::new(4));
    }

    #[test]
    fn test_try_dequeue_on_empty() {
        let mailbox = Mailbox::new(1);
        assert!(mailbox.try_dequeue().unwrap().is_none());
        assert!(mailbox.is_empty());
    }
}
