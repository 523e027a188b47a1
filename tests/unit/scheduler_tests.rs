/*!
 * Tests for the pass scheduler state machine
 */

use std::time::Duration;

use persian_rtl::app_config::SchedulerConfig;
use persian_rtl::dom::{Document, NodeId};
use persian_rtl::scheduler::{PassScheduler, SchedulerState};
use tokio::time::Instant;

fn scheduler() -> PassScheduler {
    PassScheduler::new(&SchedulerConfig {
        debounce_ms: 100,
        initial_delay_ms: 1000,
    })
}

/// Distinct node ids to register as roots (ids from separate calls may collide)
fn nodes(count: usize) -> Vec<NodeId> {
    let mut doc = Document::new();
    let root = doc.root();
    (0..count).map(|_| doc.create_element(root, "div").unwrap()).collect()
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_newScheduler_shouldBeIdleWithoutDeadline() {
    let scheduler = scheduler();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.deadline(), None);
    assert_eq!(scheduler.episodes(), 0);
    assert_eq!(scheduler.debounce(), ms(100));
    assert!(scheduler.pending().is_empty());
}

#[test]
fn test_scheduleInitial_shouldWaitForInitialDelay() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.schedule_initial(start);

    assert_eq!(scheduler.state(), SchedulerState::Scheduled);
    assert!(scheduler.begin(start + ms(500)).is_none());
    assert_eq!(scheduler.state(), SchedulerState::Scheduled);

    let batch = scheduler.begin(start + ms(1000)).expect("initial pass should start");
    assert!(batch.full);
    assert_eq!(scheduler.state(), SchedulerState::Processing);
    assert_eq!(scheduler.episodes(), 1);
}

#[test]
fn test_notify_duringInitialWindow_shouldNotMoveDeadlineEarlier() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.schedule_initial(start);

    let roots = nodes(2);
    assert!(scheduler.notify([roots[0]], start + ms(200)));
    assert_eq!(scheduler.deadline(), Some(start + ms(1000)));

    // late notifications still debounce past the initial deadline
    assert!(scheduler.notify([roots[1]], start + ms(950)));
    assert_eq!(scheduler.deadline(), Some(start + ms(1050)));
}

#[test]
fn test_notify_withBurst_shouldCoalesceIntoOneEpisode() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    let roots = nodes(5);

    for (i, root) in roots.iter().enumerate() {
        let at = start + ms(20 * i as u64);
        assert!(scheduler.notify([*root], at));
        assert!(!scheduler.is_due(at));
    }

    // the timer restarted at the last notification (t=80ms)
    assert_eq!(scheduler.deadline(), Some(start + ms(180)));
    assert!(scheduler.begin(start + ms(179)).is_none());

    let batch = scheduler.begin(start + ms(180)).expect("pass should start");
    assert!(!batch.full);
    assert_eq!(batch.roots, roots);
    assert_eq!(scheduler.episodes(), 1);
}

#[test]
fn test_notify_withDuplicateRoot_shouldRestartTimerWithoutDuplicating() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    let roots = nodes(1);

    assert!(scheduler.notify(roots.clone(), start));
    assert!(scheduler.notify(roots.clone(), start + ms(80)));
    assert_eq!(scheduler.deadline(), Some(start + ms(180)));
    assert!(!scheduler.is_due(start + ms(120)));
    assert!(scheduler.is_due(start + ms(180)));
    assert_eq!(scheduler.pending().roots.len(), 1);
}

#[test]
fn test_notify_withNoRoots_shouldNotArmTimer() {
    let start = Instant::now();
    let mut scheduler = scheduler();

    assert!(!scheduler.notify(Vec::new(), start));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.deadline(), None);
}

#[test]
fn test_notify_whileProcessing_shouldQueueForNextCycle() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    let roots = nodes(2);

    scheduler.notify([roots[0]], start);
    let first = scheduler.begin(start + ms(100)).unwrap();
    assert_eq!(first.roots, vec![roots[0]]);

    // arrives while the pass runs
    assert!(scheduler.notify([roots[1]], start + ms(110)));
    assert_eq!(scheduler.state(), SchedulerState::Processing);
    assert!(scheduler.begin(start + ms(500)).is_none());

    scheduler.finish(start + ms(120));
    assert_eq!(scheduler.state(), SchedulerState::Scheduled);
    assert_eq!(scheduler.deadline(), Some(start + ms(220)));

    let second = scheduler.begin(start + ms(220)).unwrap();
    assert_eq!(second.roots, vec![roots[1]]);
    assert_eq!(scheduler.episodes(), 2);
}

#[test]
fn test_finish_withNothingPending_shouldReturnToIdle() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.notify(nodes(1), start);
    scheduler.begin(start + ms(100)).unwrap();

    scheduler.finish(start + ms(105));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.deadline(), None);
}

#[test]
fn test_beginNow_withEmptyPending_shouldStayIdle() {
    let mut scheduler = scheduler();
    assert!(scheduler.begin_now().is_none());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.episodes(), 0);
}

#[test]
fn test_beginNow_shouldIgnoreDeadline() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.schedule_initial(start);

    let batch = scheduler.begin_now().expect("flush should start a pass");
    assert!(batch.full);
    assert_eq!(scheduler.deadline(), None);
}

#[test]
fn test_scheduleFull_shouldDebounce() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.schedule_full(start);

    assert_eq!(scheduler.deadline(), Some(start + ms(100)));
    assert!(scheduler.pending().full);
}

#[test]
fn test_cancel_shouldDropPendingWork() {
    let start = Instant::now();
    let mut scheduler = scheduler();
    scheduler.schedule_initial(start);
    scheduler.notify(nodes(3), start + ms(10));

    scheduler.cancel();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.deadline(), None);
    assert!(scheduler.pending().is_empty());
    assert!(scheduler.begin(start + ms(5000)).is_none());

    // the initial window is gone too
    scheduler.notify(nodes(1), start + ms(20));
    assert_eq!(scheduler.deadline(), Some(start + ms(120)));
}
