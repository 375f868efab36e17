//! Point-to-point, broadcast and pool scenarios

use actors::{Envelope, Payload, SendFailure, TaskError};
use itti_e2e_tests::{Scenario, ScenarioSpec};
use pool::PoolError;
use std::sync::{Arc, Barrier};
use types::{Destination, MessageKind, TaskId};

#[test_log::test]
fn tagged_buffer_travels_from_task_1_to_task_2() {
    let scenario = Scenario::start(ScenarioSpec::default()).unwrap();
    let system = Arc::clone(&scenario.system);
    let (sender, receiver) = (TaskId::new(1), TaskId::new(2));
    let kind = MessageKind::new(7);

    let buffer = system.allocate(64, kind.inner(), 1).unwrap();
    system.allocator().write(buffer, 0, b"hello").unwrap();
    system
        .send(Envelope::new(kind, sender, receiver, Payload::Pooled(buffer)))
        .unwrap();
    assert_eq!(scenario.outstanding(), 1);

    let envelope = system.receive(receiver).unwrap();
    assert_eq!(envelope.kind(), kind);
    assert_eq!(envelope.origin(), sender);
    assert_eq!(envelope.destination(), Destination::Task(receiver));
    assert_eq!(envelope.payload().len(system.allocator()), 64);

    let handle = envelope.payload().pooled_handle().unwrap();
    assert_eq!(system.allocator().info(handle).unwrap(), [7, 1]);
    assert_eq!(&system.allocator().read(handle).unwrap()[..5], b"hello");

    system.release_envelope(envelope).unwrap();
    assert_eq!(scenario.outstanding(), 0);
    assert_eq!(scenario.finish().unwrap(), 0);
}

#[test_log::test]
fn broadcast_reaches_every_task_but_the_origin() {
    let scenario = Scenario::start(ScenarioSpec {
        tasks: vec![(1, "task-1"), (2, "task-2"), (3, "task-3")],
        ..ScenarioSpec::default()
    })
    .unwrap();
    let system = &scenario.system;
    let origin = TaskId::new(1);

    let buffer = system.allocate(32, 0, 0).unwrap();
    system.allocator().write(buffer, 0, &[0xAB; 32]).unwrap();
    let report = system.broadcast(Envelope::new(
        MessageKind::new(40),
        origin,
        Destination::Broadcast,
        Payload::Pooled(buffer),
    ));
    assert_eq!(report.delivered, 2);
    assert!(report.is_complete());

    let at_2 = system.receive(TaskId::new(2)).unwrap();
    let at_3 = system.receive(TaskId::new(3)).unwrap();
    assert_eq!(at_2.origin(), origin);
    assert_eq!(at_3.origin(), origin);
    assert!(system.try_receive(TaskId::new(2)).unwrap().is_none());
    assert!(system.try_receive(TaskId::new(3)).unwrap().is_none());
    assert!(system.try_receive(origin).unwrap().is_none());

    // Each recipient owns its own buffer
    let copy_3 = at_3.payload().pooled_handle().unwrap();
    assert_ne!(at_2.payload().pooled_handle(), Some(copy_3));
    system.release_envelope(at_2).unwrap();
    assert_eq!(system.allocator().read(copy_3).unwrap()[..32], [0xAB; 32]);
    system.release_envelope(at_3).unwrap();

    assert_eq!(scenario.outstanding(), 0);
}

#[test_log::test]
fn three_concurrent_allocations_from_capacity_two() {
    let scenario = Scenario::start(ScenarioSpec {
        pools: vec![(2, 32)],
        ..ScenarioSpec::default()
    })
    .unwrap();
    let barrier = Arc::new(Barrier::new(3));

    let outcomes: Vec<_> = (0..3)
        .map(|_| {
            let system = Arc::clone(&scenario.system);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                system.allocate(32, 0, 0)
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();

    let granted: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(granted.len(), 2);
    let exhausted = outcomes
        .iter()
        .filter(|r| matches!(r, Err(TaskError::Pool(PoolError::Exhausted { .. }))))
        .count();
    assert_eq!(exhausted, 1);

    for handle in granted {
        scenario.system.free(*handle, 0).unwrap();
    }
    assert_eq!(scenario.outstanding(), 0);
}

#[test_log::test]
fn messages_arrive_in_send_order() {
    let scenario = Scenario::start(ScenarioSpec::default()).unwrap();
    let system = &scenario.system;
    let (a, b) = (TaskId::new(1), TaskId::new(2));

    for seq in 0u32..50 {
        let payload = Payload::inline(&seq.to_le_bytes()).unwrap();
        system
            .send(Envelope::new(MessageKind::new(9), a, b, payload))
            .unwrap();
    }
    for expected in 0u32..50 {
        let envelope = system.receive(b).unwrap();
        let Payload::Inline(inline) = envelope.payload() else {
            panic!("expected inline payload");
        };
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(inline.as_bytes());
        assert_eq!(u32::from_le_bytes(bytes), expected);
    }
}

#[test_log::test]
fn full_mailbox_fails_fast_and_recovers() {
    let scenario = Scenario::start(ScenarioSpec {
        mailbox_capacity: 2,
        ..ScenarioSpec::default()
    })
    .unwrap();
    let system = &scenario.system;
    let (a, b) = (TaskId::new(1), TaskId::new(2));
    let kind = MessageKind::new(11);

    system.send(Envelope::new(kind, a, b, Payload::Empty)).unwrap();
    system.send(Envelope::new(kind, a, b, Payload::Empty)).unwrap();

    let buffer = system.allocate(64, 0, 0).unwrap();
    let err = system
        .send(Envelope::new(kind, a, b, Payload::Pooled(buffer)))
        .unwrap_err();
    assert!(matches!(err.reason, SendFailure::MailboxFull { capacity: 2 }));
    assert_eq!(scenario.outstanding(), 1);

    let drained = system.receive(b).unwrap();
    system.release_envelope(drained).unwrap();
    system.send(err.into_envelope()).unwrap();

    let mut received = 0;
    while let Some(envelope) = system.try_receive(b).unwrap() {
        system.release_envelope(envelope).unwrap();
        received += 1;
    }
    assert_eq!(received, 2);
    assert_eq!(scenario.outstanding(), 0);
    assert_eq!(system.stats().mailbox_full_events, 1);
}

#[test_log::test]
fn unknown_destination_hands_payload_back() {
    let scenario = Scenario::start(ScenarioSpec::default()).unwrap();
    let system = &scenario.system;

    let buffer = system.allocate(16, 0, 0).unwrap();
    let err = system
        .send(Envelope::new(
            MessageKind::new(5),
            TaskId::new(1),
            TaskId::new(99),
            Payload::Pooled(buffer),
        ))
        .unwrap_err();
    assert!(matches!(err.reason, SendFailure::UnknownDestination));

    let envelope = err.into_envelope();
    assert_eq!(envelope.payload().pooled_handle(), Some(buffer));
    system.release_envelope(envelope).unwrap();
    assert_eq!(scenario.outstanding(), 0);
}
