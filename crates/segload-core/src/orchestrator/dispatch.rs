//! Dispatch loop: launch a worker per pending unit, never more than the gate allows.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::worker::spawn_worker;
use crate::aggregate::{UnitEvent, UnitReport};
use crate::control::{Interrupt, TaskControl};
use crate::fetch::Fetcher;
use crate::gate::AdmissionGate;
use crate::record::{TaskRecord, UnitId};

/// What the dispatch loop did in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Units handed to a running worker thread.
    pub launched: usize,
    /// Units already complete at start.
    pub skipped: usize,
    /// Pending units never launched because of a stop/cancel request.
    pub unlaunched: usize,
}

pub(super) struct Dispatcher {
    pub(super) task: Arc<TaskRecord>,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) gate: Arc<AdmissionGate>,
    pub(super) control: TaskControl,
    pub(super) tx: Sender<UnitReport>,
    pub(super) poll: Duration,
}

impl Dispatcher {
    /// Runs on the dispatch thread. Returns after every launched worker has been joined.
    pub(super) fn run(self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut workers: Vec<(UnitId, JoinHandle<()>)> = Vec::new();
        let units = &self.task.units;

        let mut cursor = 0;
        while cursor < units.len() {
            let unit = &units[cursor];
            if unit.complete {
                tracing::debug!(unit_id = unit.id, "unit already complete, skipping");
                summary.skipped += 1;
                cursor += 1;
                continue;
            }
            if !self.wait_for_token() {
                break;
            }
            let spawned = spawn_worker(
                Arc::clone(&self.fetcher),
                unit.clone(),
                self.task.segment_path(unit.id),
                self.task.open_dynamic_file,
                self.control.clone(),
                self.tx.clone(),
            );
            match spawned {
                Ok(handle) => {
                    workers.push((unit.id, handle));
                    summary.launched += 1;
                }
                Err(e) => {
                    tracing::error!(unit_id = unit.id, "could not spawn fetch worker: {}", e);
                    self.report(
                        unit.id,
                        true,
                        UnitEvent::Failed {
                            retryable: true,
                            cause: anyhow::Error::new(e).context("spawn fetch worker"),
                        },
                    );
                }
            }
            cursor += 1;
        }

        if cursor < units.len() {
            // Interrupted: account for every pending unit that never got a worker.
            let interrupt = self.control.interrupt().unwrap_or(Interrupt::Stop);
            for unit in units[cursor..].iter().filter(|u| !u.complete) {
                let event = match interrupt {
                    Interrupt::Stop => UnitEvent::Stopped,
                    Interrupt::Cancel => UnitEvent::Cancelled,
                };
                self.report(unit.id, false, event);
                summary.unlaunched += 1;
            }
            tracing::info!(unlaunched = summary.unlaunched, ?interrupt, "dispatch interrupted");
        }
        drop(self.tx);

        for (unit_id, handle) in workers {
            if handle.join().is_err() {
                tracing::error!(unit_id, "fetch worker panicked");
            }
        }
        tracing::debug!(?summary, "dispatch finished");
        summary
    }

    /// Block until a token is taken. Returns false if a stop/cancel arrives first.
    fn wait_for_token(&self) -> bool {
        loop {
            if self.control.is_interrupted() {
                return false;
            }
            if self.gate.acquire_timeout(self.poll) {
                // A token freed by a worker reacting to the interrupt must not start another unit.
                if self.control.is_interrupted() {
                    self.gate.release();
                    return false;
                }
                return true;
            }
        }
    }

    fn report(&self, unit_id: UnitId, admitted: bool, event: UnitEvent) {
        let _ = self.tx.send(UnitReport {
            unit_id,
            admitted,
            event,
        });
    }
}
