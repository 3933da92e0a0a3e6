//! Task-level state machine over per-unit outcomes.
//!
//! `step` is a pure function from (counters, unit event) to (counters,
//! optional task transition). The event consumer owns the only `Tally` of a
//! run and feeds it one event at a time, so the counters need no locking.
//!
//! Transition rules, checked after every terminal event:
//!
//! | event     | task transition when                                  |
//! |-----------|-------------------------------------------------------|
//! | Stopped   | `stopped + failed + completed == started`             |
//! | Cancelled | `cancelled + failed + completed == started`           |
//! | Failed    | `stopped + cancelled + failed + completed == started` |
//! | Completed | `completed == started`                                |
//!
//! Stopped and Cancelled accept any mix of outcomes that adds up to
//! `started`, so a task can report Stopped although some of its units
//! completed. Only Completed needs every unit to agree.
//!
//! When the event's own rule does not hold but every unit has reported, the
//! run still has to end: it settles as Cancelled if any unit was cancelled,
//! else Stopped if any unit stopped, else Failed.

use crate::record::UnitId;

/// Report from one fetch worker.
#[derive(Debug)]
pub enum UnitEvent {
    /// Bytes received since the previous report.
    Progress(u64),
    Stopped,
    Cancelled,
    Failed {
        retryable: bool,
        cause: anyhow::Error,
    },
    Completed,
}

impl UnitEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UnitEvent::Progress(_))
    }
}

/// A unit event tagged with its origin, as carried on the consumer channel.
#[derive(Debug)]
pub struct UnitReport {
    pub unit_id: UnitId,
    /// True if the unit held an admission token; its terminal event gives it back.
    pub admitted: bool,
    pub event: UnitEvent,
}

/// Task-level terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Stopped,
    Cancelled,
    Failed,
    Completed,
}

/// Runtime aggregation counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Units selected for this run (not complete at start).
    pub started: usize,
    pub stopped: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub completed: usize,
    /// Bytes received across all units; never decreases.
    pub progress: u64,
}

impl Tally {
    pub fn new(started: usize) -> Self {
        Self {
            started,
            ..Self::default()
        }
    }

    /// Units that reported a terminal outcome.
    pub fn terminal(&self) -> usize {
        self.stopped + self.cancelled + self.failed + self.completed
    }

    pub fn is_stop(&self) -> bool {
        self.started == self.stopped + self.failed + self.completed
    }

    pub fn is_cancel(&self) -> bool {
        self.started == self.cancelled + self.failed + self.completed
    }

    pub fn is_fail(&self) -> bool {
        self.started == self.terminal()
    }

    pub fn is_complete(&self) -> bool {
        self.started == self.completed
    }

    /// Transition due before any event arrives: nothing to run means done.
    pub fn initial(&self) -> Option<TaskState> {
        (self.started == 0).then_some(TaskState::Completed)
    }

    fn settled(&self) -> Option<TaskState> {
        if self.terminal() < self.started {
            return None;
        }
        Some(if self.cancelled > 0 {
            TaskState::Cancelled
        } else if self.stopped > 0 {
            TaskState::Stopped
        } else {
            TaskState::Failed
        })
    }
}

/// Apply one unit event. Returns the new counters and the task transition it triggers, if any.
pub fn step(mut tally: Tally, event: &UnitEvent) -> (Tally, Option<TaskState>) {
    let own = match event {
        UnitEvent::Progress(delta) => {
            tally.progress = tally.progress.saturating_add(*delta);
            return (tally, None);
        }
        UnitEvent::Stopped => {
            tally.stopped += 1;
            tally.is_stop().then_some(TaskState::Stopped)
        }
        UnitEvent::Cancelled => {
            tally.cancelled += 1;
            tally.is_cancel().then_some(TaskState::Cancelled)
        }
        UnitEvent::Failed { .. } => {
            tally.failed += 1;
            tally.is_fail().then_some(TaskState::Failed)
        }
        UnitEvent::Completed => {
            tally.completed += 1;
            tally.is_complete().then_some(TaskState::Completed)
        }
    };
    let transition = own.or_else(|| tally.settled());
    (tally, transition)
}
