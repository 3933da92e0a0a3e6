//! Record-layer decorator: persist completion flags as units finish.

use std::sync::Arc;

use super::{FetchJob, FetchOutcome, Fetcher};
use crate::record::RecordStore;

/// Wraps a fetcher and marks the unit complete in `store` once it reports Completed.
///
/// A unit whose flag cannot be persisted is reported as a retryable failure so
/// the task does not claim a completion the next run would not see.
pub struct RecordingFetcher<F> {
    inner: F,
    store: Arc<dyn RecordStore>,
}

impl<F: Fetcher> RecordingFetcher<F> {
    pub fn new(inner: F, store: Arc<dyn RecordStore>) -> Self {
        Self { inner, store }
    }
}

impl<F: Fetcher> Fetcher for RecordingFetcher<F> {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome {
        let outcome = self.inner.fetch(job, progress);
        if !outcome.is_completed() {
            return outcome;
        }
        match self.store.mark_unit_complete(job.unit.id) {
            Ok(()) => FetchOutcome::Completed,
            Err(e) => {
                tracing::error!(unit_id = job.unit.id, "persisting unit completion failed: {}", e);
                FetchOutcome::Failed {
                    retryable: true,
                    cause: anyhow::Error::new(e).context(format!("unit {}", job.unit.id)),
                }
            }
        }
    }
}
