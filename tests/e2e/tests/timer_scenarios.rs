//! Timers and termination driven through the control thread

use actors::Payload;
use itti_e2e_tests::{Scenario, ScenarioSpec};
use std::time::Duration;
use timers::{TimerExpiry, TimerKind};
use types::{MessageKind, TaskId};

fn with_control() -> Scenario {
    Scenario::start(ScenarioSpec {
        with_control: true,
        ..ScenarioSpec::default()
    })
    .unwrap()
}

#[test_log::test]
fn one_shot_timer_delivers_exactly_one_expiry() {
    let scenario = with_control();
    let owner = TaskId::new(1);
    let timers = scenario.timers().unwrap();

    let id = timers
        .arm(owner, Duration::from_millis(10), TimerKind::OneShot, 42)
        .unwrap();
    let envelope = scenario.system.receive(owner).unwrap();
    assert_eq!(envelope.kind(), MessageKind::TIMER_EXPIRED);
    assert_eq!(envelope.origin(), TaskId::CORE);
    assert_eq!(
        TimerExpiry::from_envelope(&envelope).map(|e| (e.timer, e.user_data)),
        Some((id, 42))
    );
    scenario.system.release_envelope(envelope).unwrap();

    std::thread::sleep(Duration::from_millis(80));
    assert!(scenario.system.try_receive(owner).unwrap().is_none());
    assert!(!timers.disarm(id));

    scenario.finish().unwrap();
}

#[test_log::test]
fn disarmed_timer_never_fires() {
    let scenario = with_control();
    let owner = TaskId::new(2);
    let timers = scenario.timers().unwrap();

    let id = timers
        .arm(owner, Duration::from_millis(40), TimerKind::OneShot, 0)
        .unwrap();
    assert!(timers.disarm(id));

    std::thread::sleep(Duration::from_millis(120));
    assert!(scenario.system.try_receive(owner).unwrap().is_none());

    scenario.finish().unwrap();
}

#[test_log::test]
fn periodic_worker_stops_on_terminate() {
    let scenario = with_control();
    let (observer, worker) = (TaskId::new(1), TaskId::new(3));
    let ready = MessageKind::new(50);
    let timers = scenario.timers().unwrap().clone();

    scenario
        .system
        .spawn_task(worker, "worker", move |ctx| {
            let period = Duration::from_millis(5);
            let timer = timers
                .arm(ctx.id(), period, TimerKind::Periodic(period), 0)
                .unwrap();
            let mut expiries = 0;
            loop {
                let envelope = ctx.receive().unwrap();
                let kind = envelope.kind();
                ctx.release(envelope).unwrap();
                if kind == MessageKind::TERMINATE {
                    break;
                }
                if kind == MessageKind::TIMER_EXPIRED {
                    expiries += 1;
                    if expiries == 3 {
                        ctx.send(observer, ready, Payload::Empty).unwrap();
                    }
                }
            }
            timers.disarm(timer);
        })
        .unwrap();

    let notice = scenario.system.receive(observer).unwrap();
    assert_eq!(notice.kind(), ready);
    assert_eq!(notice.origin(), worker);

    let report = scenario.system.terminate_tasks(TaskId::CORE);
    assert_eq!(report.delivered, 3);
    assert!(scenario.system.is_terminating());

    assert_eq!(scenario.finish().unwrap(), 0);
}
