//! Curl-backed fetch worker: GET one unit into its segment file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use super::{FetchError, FetchJob, FetchOutcome, Fetcher};
use crate::config::FetchConfig;

/// Fetches a unit with a blocking curl `Easy` handle on the calling worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlFetcher {
    config: FetchConfig,
}

impl CurlFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn transfer(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> Result<(), FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&job.unit.url)?;
        easy.follow_location(true)?;
        easy.fail_on_error(true)?;
        easy.connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))?;
        // Low-speed abort instead of a wall-clock timeout so long segments on slow links survive.
        easy.low_speed_limit(self.config.low_speed_limit_bytes)?;
        easy.low_speed_time(Duration::from_secs(self.config.low_speed_time_secs))?;
        easy.progress(true)?;

        // Static allocation creates (and truncates) the segment file before any byte arrives.
        let mut file: Option<File> = if job.open_dynamic_file {
            None
        } else {
            Some(create_target(job.target).map_err(FetchError::Storage)?)
        };
        let mut storage_error: Option<std::io::Error> = None;
        let target = job.target;
        let control = job.control;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if file.is_none() {
                    match create_target(target) {
                        Ok(f) => file = Some(f),
                        Err(e) => {
                            storage_error = Some(e);
                            return Ok(0);
                        }
                    }
                }
                let Some(f) = file.as_mut() else {
                    return Ok(0);
                };
                if let Err(e) = f.write_all(data) {
                    storage_error = Some(e);
                    return Ok(0);
                }
                progress(data.len() as u64);
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !control.is_interrupted())?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if e.is_write_error() {
                if let Some(io_err) = storage_error.take() {
                    return Err(FetchError::Storage(io_err));
                }
            }
            if e.is_http_returned_error() {
                return Err(FetchError::Http(easy.response_code()?));
            }
            return Err(FetchError::Curl(e));
        }

        let file = match file {
            Some(f) => f,
            // Empty body under dynamic allocation: the segment still needs a file to merge.
            None => create_target(target).map_err(FetchError::Storage)?,
        };
        file.sync_all().map_err(FetchError::Storage)?;
        Ok(())
    }
}

fn create_target(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome {
        if let Some(interrupt) = job.control.interrupt() {
            return FetchOutcome::interrupted(interrupt);
        }
        match self.transfer(job, progress) {
            Ok(()) => FetchOutcome::Completed,
            Err(e) => {
                // An abort from the progress callback is the requested interrupt, not a failure.
                if let Some(interrupt) = job.control.interrupt() {
                    tracing::debug!(unit_id = job.unit.id, "fetch interrupted: {}", e);
                    return FetchOutcome::interrupted(interrupt);
                }
                tracing::warn!(unit_id = job.unit.id, url = %job.unit.url, "fetch failed: {}", e);
                FetchOutcome::failed(e)
            }
        }
    }
}
