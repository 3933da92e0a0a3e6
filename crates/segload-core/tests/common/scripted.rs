//! Scripted fetcher and recording listener for orchestration tests.
//!
//! The fetcher plays back a per-unit script instead of touching the network
//! and tracks how many workers run at once.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use segload_core::fetch::{FetchJob, FetchOutcome, Fetcher};
use segload_core::listener::TaskListener;
use segload_core::record::UnitId;

#[derive(Debug, Clone)]
pub enum Script {
    /// Write the bytes and complete.
    Complete(Vec<u8>),
    /// Write the bytes, then block until the task is stopped or cancelled.
    Hold(Vec<u8>),
    /// Report Cancelled without any task-level request.
    Cancel,
    Fail { retryable: bool },
    Panic,
}

#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<UnitId, Script>,
    /// Used for units without a script.
    fallback: Option<Script>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<UnitId>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units `0..count` each complete with `seg{i};` as content.
    pub fn completing(count: u32) -> Self {
        let mut f = Self::new();
        for i in 0..count {
            f = f.script(i, Script::Complete(body(i)));
        }
        f
    }

    pub fn script(mut self, unit: UnitId, script: Script) -> Self {
        self.scripts.insert(unit, script);
        self
    }

    pub fn fallback(mut self, script: Script) -> Self {
        self.fallback = Some(script);
        self
    }

    /// Time each worker spends before acting on its script.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<UnitId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Content the scripted fetcher writes for unit `i` by default.
pub fn body(i: UnitId) -> Vec<u8> {
    format!("seg{};", i).into_bytes()
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, job: &FetchJob<'_>, progress: &mut dyn FnMut(u64)) -> FetchOutcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);
        self.calls.lock().unwrap().push(job.unit.id);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let script = self
            .scripts
            .get(&job.unit.id)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| Script::Complete(body(job.unit.id)));
        match script {
            Script::Complete(bytes) => {
                fs::write(job.target, &bytes).unwrap();
                progress(bytes.len() as u64);
                FetchOutcome::Completed
            }
            Script::Hold(bytes) => {
                fs::write(job.target, &bytes).unwrap();
                progress(bytes.len() as u64);
                loop {
                    if let Some(interrupt) = job.control.interrupt() {
                        return FetchOutcome::interrupted(interrupt);
                    }
                    std::thread::sleep(Duration::from_millis(2));
                }
            }
            Script::Cancel => FetchOutcome::Cancelled,
            Script::Fail { retryable } => FetchOutcome::Failed {
                retryable,
                cause: anyhow::anyhow!("scripted failure of unit {}", job.unit.id),
            },
            Script::Panic => panic!("scripted panic in unit {}", job.unit.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Progress(u64),
    Stop(u64),
    Cancel,
    Fail { retryable: bool, has_cause: bool },
    Complete,
}

impl Call {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Call::Progress(_))
    }
}

/// Listener that records every callback. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingListener {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn terminal_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_terminal).collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TaskListener for RecordingListener {
    fn on_progress(&mut self, total_progress: u64) {
        self.push(Call::Progress(total_progress));
    }

    fn on_stop(&mut self, total_progress: u64) {
        self.push(Call::Stop(total_progress));
    }

    fn on_cancel(&mut self) {
        self.push(Call::Cancel);
    }

    fn on_fail(&mut self, retryable: bool, cause: Option<&anyhow::Error>) {
        self.push(Call::Fail {
            retryable,
            has_cause: cause.is_some(),
        });
    }

    fn on_complete(&mut self) {
        self.push(Call::Complete);
    }
}
