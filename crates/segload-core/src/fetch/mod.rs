//! Fetch worker contract.
//!
//! A `Fetcher` downloads one unit into its segment file. The orchestrator runs
//! each call on its own worker thread, forwards the progress deltas it reports
//! and turns the returned `FetchOutcome` into the unit's single terminal event.

mod http;
mod error;
mod recording;

pub use http::CurlFetcher;
pub use error::{classify_curl_error, classify_http_status, FetchError};
pub use recording::RecordingFetcher;

use std::path::Path;
use std::sync::Arc;

use crate::control::{Interrupt, TaskControl};
use crate::record::UnitRecord;

/// Everything a worker needs for one unit.
#[derive(Debug, Clone, Copy)]
pub struct FetchJob<'a> {
    pub unit: &'a UnitRecord,
    /// Segment file to write.
    pub target: &'a Path,
    /// Task's dynamic-allocation flag: create the target lazily instead of up front.
    pub open_dynamic_file: bool,
    /// Polled during the transfer; the worker must end promptly once set.
    pub control: &'a TaskControl,
}

/// Terminal outcome of one unit.
#[derive(Debug)]
pub enum FetchOutcome {
    Completed,
    Stopped,
    Cancelled,
    Failed {
        retryable: bool,
        cause: anyhow::Error,
    },
}

impl FetchOutcome {
    pub fn failed(err: FetchError) -> Self {
        FetchOutcome::Failed {
            retryable: err.is_retryable(),
            cause: err.into(),
        }
    }

    pub fn interrupted(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Stop => FetchOutcome::Stopped,
            Interrupt::Cancel => FetchOutcome::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, FetchOutcome::Completed)
    }
}

/// Downloads one unit. Must report progress deltas through `progress` and
/// return exactly once; the return value is the unit's terminal outcome.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome {
        (**self).fetch(job, progress)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome {
        (**self).fetch(job, progress)
    }
}
