/*!
 * Pass scheduling.
 *
 * `PassScheduler` is the `Idle -> Scheduled -> Processing -> Idle` state
 * machine that coalesces bursts of mutation notifications into a single
 * annotation pass. It owns no timers: the caller asks for the current
 * deadline, sleeps until it, and then calls `begin`. Time is passed in
 * explicitly so the machine stays deterministic.
 */

use std::time::Duration;

use log::trace;
use tokio::time::Instant;

use crate::app_config::SchedulerConfig;
use crate::dom::NodeId;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    /// A pass is armed and will start at the deadline
    Scheduled,
    /// A pass is running; new notifications wait for the next cycle
    Processing,
}

/// Work handed to one processing episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassBatch {
    /// Annotate the whole document instead of individual roots
    pub full: bool,
    /// Roots registered since the previous pass, in arrival order
    pub roots: Vec<NodeId>,
}

impl PassBatch {
    pub fn is_empty(&self) -> bool {
        !self.full && self.roots.is_empty()
    }
}

#[derive(Debug)]
pub struct PassScheduler {
    state: SchedulerState,
    debounce: Duration,
    initial_delay: Duration,
    deadline: Option<Instant>,
    /// End of the initial load window; no pass starts before it
    initial_deadline: Option<Instant>,
    pending: PassBatch,
    episodes: u64,
}

impl PassScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            debounce: Duration::from_millis(config.debounce_ms),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            deadline: None,
            initial_deadline: None,
            pending: PassBatch::default(),
            episodes: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of processing episodes started so far
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn pending(&self) -> &PassBatch {
        &self.pending
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Arm the first full pass after the initial delay
    pub fn schedule_initial(&mut self, now: Instant) {
        let deadline = now + self.initial_delay;
        self.pending.full = true;
        self.initial_deadline = Some(deadline);
        if self.state != SchedulerState::Processing {
            self.state = SchedulerState::Scheduled;
            self.deadline = Some(deadline);
        }
        trace!("Initial pass scheduled in {:?}", self.initial_delay);
    }

    /// Request a debounced full pass
    pub fn schedule_full(&mut self, now: Instant) {
        self.pending.full = true;
        self.rearm(now);
    }

    /// Register affected roots and (re)start the debounce timer.
    ///
    /// Any notification carrying a root restarts the timer, including one
    /// whose roots are all pending already, so a node edited over and over
    /// is only processed once it goes quiet. Returns `false` when `roots`
    /// was empty.
    pub fn notify<I>(&mut self, roots: I, now: Instant) -> bool
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut received = false;
        for root in roots {
            received = true;
            if !self.pending.roots.contains(&root) {
                self.pending.roots.push(root);
            }
        }
        if !received {
            return false;
        }
        self.rearm(now);
        true
    }

    fn rearm(&mut self, now: Instant) {
        if self.state == SchedulerState::Processing {
            // picked up by `finish`
            return;
        }
        let mut deadline = now + self.debounce;
        if let Some(initial) = self.initial_deadline {
            if initial > deadline {
                deadline = initial;
            }
        }
        self.deadline = Some(deadline);
        self.state = SchedulerState::Scheduled;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.state == SchedulerState::Scheduled && self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Start a pass if the deadline has passed
    pub fn begin(&mut self, now: Instant) -> Option<PassBatch> {
        if !self.is_due(now) {
            return None;
        }
        self.begin_now()
    }

    /// Start a pass immediately, ignoring the deadline
    pub fn begin_now(&mut self) -> Option<PassBatch> {
        if self.state == SchedulerState::Processing {
            return None;
        }
        self.deadline = None;
        self.initial_deadline = None;
        if self.pending.is_empty() {
            self.state = SchedulerState::Idle;
            return None;
        }
        self.state = SchedulerState::Processing;
        self.episodes += 1;
        Some(std::mem::take(&mut self.pending))
    }

    /// End the running pass; work registered meanwhile is re-armed
    pub fn finish(&mut self, now: Instant) {
        if self.state != SchedulerState::Processing {
            return;
        }
        self.state = SchedulerState::Idle;
        if !self.pending.is_empty() {
            self.rearm(now);
        }
    }

    /// Drop any armed pass and its pending work
    pub fn cancel(&mut self) {
        self.pending = PassBatch::default();
        self.deadline = None;
        self.initial_deadline = None;
        if self.state == SchedulerState::Scheduled {
            self.state = SchedulerState::Idle;
        }
    }
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}
