//! Fetch worker threads and their event reporting.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::aggregate::{UnitEvent, UnitReport};
use crate::control::TaskControl;
use crate::fetch::{FetchJob, FetchOutcome, Fetcher};
use crate::record::{UnitId, UnitRecord};

/// Sends one unit's events to the consumer. Guarantees exactly one terminal
/// event: if dropped before `finish` (e.g. the fetcher panicked), it reports a
/// non-retryable failure.
pub(super) struct UnitReporter {
    unit_id: UnitId,
    tx: Sender<UnitReport>,
    finished: bool,
}

impl UnitReporter {
    pub(super) fn new(unit_id: UnitId, tx: Sender<UnitReport>) -> Self {
        Self {
            unit_id,
            tx,
            finished: false,
        }
    }

    pub(super) fn progress(&self, delta: u64) {
        if delta > 0 {
            self.send(UnitEvent::Progress(delta));
        }
    }

    pub(super) fn finish(mut self, outcome: FetchOutcome) {
        self.finished = true;
        let event = match outcome {
            FetchOutcome::Completed => UnitEvent::Completed,
            FetchOutcome::Stopped => UnitEvent::Stopped,
            FetchOutcome::Cancelled => UnitEvent::Cancelled,
            FetchOutcome::Failed { retryable, cause } => UnitEvent::Failed { retryable, cause },
        };
        self.send(event);
    }

    fn send(&self, event: UnitEvent) {
        // The consumer hangs up once the task settled; late reports are moot.
        let _ = self.tx.send(UnitReport {
            unit_id: self.unit_id,
            admitted: true,
            event,
        });
    }
}

impl Drop for UnitReporter {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(unit_id = self.unit_id, "fetch worker ended without an outcome");
            self.send(UnitEvent::Failed {
                retryable: false,
                cause: anyhow::anyhow!("fetch worker for unit {} ended without an outcome", self.unit_id),
            });
        }
    }
}

/// Start a worker thread fetching `unit` into `target`.
pub(super) fn spawn_worker(
    fetcher: Arc<dyn Fetcher>,
    unit: UnitRecord,
    target: PathBuf,
    open_dynamic_file: bool,
    control: TaskControl,
    tx: Sender<UnitReport>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("segload-unit-{}", unit.id))
        .spawn(move || {
            let reporter = UnitReporter::new(unit.id, tx);
            let job = FetchJob {
                unit: &unit,
                target: &target,
                open_dynamic_file,
                control: &control,
            };
            tracing::debug!(unit_id = unit.id, url = %unit.url, "fetch worker started");
            let outcome = fetcher.fetch(&job, &mut |delta| reporter.progress(delta));
            tracing::debug!(unit_id = unit.id, ?outcome, "fetch worker finished");
            reporter.finish(outcome);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn dropped_reporter_reports_failure() {
        let (tx, rx) = mpsc::channel();
        drop(UnitReporter::new(4, tx));
        let report = rx.recv().unwrap();
        assert_eq!(report.unit_id, 4);
        assert!(matches!(report.event, UnitEvent::Failed { retryable: false, .. }));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn finish_sends_one_terminal_event() {
        let (tx, rx) = mpsc::channel();
        let reporter = UnitReporter::new(1, tx);
        reporter.progress(0);
        reporter.progress(12);
        reporter.finish(FetchOutcome::Completed);
        let events: Vec<_> = rx.iter().map(|r| r.event).collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], UnitEvent::Progress(12)));
        assert!(matches!(events[1], UnitEvent::Completed));
    }
}
