//! Event consumer: the only owner of a run's counters.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::TaskOutcome;
use crate::aggregate::{step, Tally, TaskState, UnitEvent, UnitReport};
use crate::gate::AdmissionGate;
use crate::listener::TaskListener;
use crate::merge;
use crate::record::TaskRecord;

pub(super) struct Consumer {
    pub(super) rx: Receiver<UnitReport>,
    pub(super) gate: Arc<AdmissionGate>,
    pub(super) listener: Box<dyn TaskListener>,
    pub(super) task: Arc<TaskRecord>,
    pub(super) tally: Tally,
    pub(super) progress_interval: Duration,
    pub(super) last_failure: Option<(bool, anyhow::Error)>,
}

impl Consumer {
    /// Drain reports until the task settles, then notify the listener once.
    pub(super) fn run(mut self) -> TaskOutcome {
        if let Some(state) = self.tally.initial() {
            tracing::info!("no pending units, task already complete");
            return self.finish(state);
        }

        let mut next_tick = Instant::now() + self.progress_interval;
        loop {
            let now = Instant::now();
            if now >= next_tick {
                self.listener.on_progress(self.tally.progress);
                next_tick = now + self.progress_interval;
            }
            match self.rx.recv_timeout(next_tick.saturating_duration_since(now)) {
                Ok(report) => {
                    if let Some(state) = self.handle(report) {
                        return self.finish(state);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Every sender is gone but the counters never settled.
                    tracing::error!(tally = ?self.tally, "event channel closed before the task settled");
                    let cause = anyhow::anyhow!(
                        "{} of {} units never reported an outcome",
                        self.tally.started - self.tally.terminal(),
                        self.tally.started
                    );
                    self.listener.on_fail(true, Some(&cause));
                    return TaskOutcome::Failed {
                        retryable: true,
                        cause: Some(cause),
                    };
                }
            }
        }
    }

    fn handle(&mut self, report: UnitReport) -> Option<TaskState> {
        let (tally, transition) = step(self.tally, &report.event);
        self.tally = tally;
        if !report.event.is_terminal() {
            return transition;
        }

        if report.admitted {
            self.gate.release();
        }
        match report.event {
            UnitEvent::Failed { retryable, cause } => {
                tracing::warn!(unit_id = report.unit_id, retryable, "unit failed: {:#}", cause);
                self.last_failure = Some((retryable, cause));
            }
            event => tracing::debug!(unit_id = report.unit_id, ?event, "unit finished"),
        }
        tracing::debug!(tally = ?self.tally, "tally");
        transition
    }

    fn finish(mut self, state: TaskState) -> TaskOutcome {
        tracing::info!(?state, tally = ?self.tally, "task settled");
        match state {
            TaskState::Completed => {
                if let Err(e) = self.merge_if_block() {
                    let cause = anyhow::Error::new(e).context("merge segments");
                    self.listener.on_fail(false, Some(&cause));
                    return TaskOutcome::Failed {
                        retryable: false,
                        cause: Some(cause),
                    };
                }
                self.listener.on_complete();
                TaskOutcome::Completed
            }
            TaskState::Stopped => {
                self.listener.on_stop(self.tally.progress);
                TaskOutcome::Stopped {
                    progress: self.tally.progress,
                }
            }
            TaskState::Cancelled => {
                self.listener.on_cancel();
                TaskOutcome::Cancelled
            }
            TaskState::Failed => {
                let (retryable, cause) = match self.last_failure.take() {
                    Some((retryable, cause)) => (retryable, Some(cause)),
                    None => (false, None),
                };
                self.listener.on_fail(retryable, cause.as_ref());
                TaskOutcome::Failed { retryable, cause }
            }
        }
    }

    fn merge_if_block(&self) -> Result<(), merge::MergeError> {
        if !self.task.is_block {
            return Ok(());
        }
        // A resumed task with nothing left to fetch may have been merged by the previous run.
        if self.tally.started == 0 && merge::already_merged(&self.task) {
            let len = merge::verify_output(&self.task)?;
            tracing::debug!(path = %self.task.file_path.display(), bytes = len, "output already merged");
            return Ok(());
        }
        let len = merge::merge_task(&self.task)?;
        tracing::info!(path = %self.task.file_path.display(), bytes = len, "output merged");
        Ok(())
    }
}
