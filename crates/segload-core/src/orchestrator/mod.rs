//! Orchestration of one segmented task.
//!
//! Three kinds of threads cooperate on a run:
//!
//! - a dispatch thread walks the unit list in order and launches one fetch
//!   worker per pending unit, holding an admission token for each;
//! - up to `capacity` worker threads fetch one unit each and report progress
//!   and exactly one terminal outcome over a channel;
//! - a consumer thread drains that channel, owns the counters, gives tokens
//!   back and, once the counters settle, merges (block mode) and notifies the
//!   listener.
//!
//! Stop and cancel go through [`TaskControl`]: the dispatch loop stops
//! launching, reports the units it will never start, and running workers end
//! their transfer.

mod consumer;
mod dispatch;
mod worker;

pub use dispatch::DispatchSummary;

use anyhow::{Context, Result};
use std::fs;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use crate::aggregate::Tally;
use crate::config::SegloadConfig;
use crate::control::TaskControl;
use crate::fetch::Fetcher;
use crate::gate::AdmissionGate;
use crate::listener::TaskListener;
use crate::record::TaskRecord;
use consumer::Consumer;
use dispatch::Dispatcher;

/// How a run ended. Mirrors the terminal listener callback that fired.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    Stopped { progress: u64 },
    Cancelled,
    Failed {
        retryable: bool,
        cause: Option<anyhow::Error>,
    },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// One orchestration run over a task record.
pub struct Orchestrator {
    task: TaskRecord,
    fetcher: Arc<dyn Fetcher>,
    listener: Box<dyn TaskListener>,
    config: SegloadConfig,
    control: TaskControl,
}

impl Orchestrator {
    pub fn new(
        task: TaskRecord,
        fetcher: Arc<dyn Fetcher>,
        listener: Box<dyn TaskListener>,
        config: SegloadConfig,
    ) -> Self {
        Self {
            task,
            fetcher,
            listener,
            config,
            control: TaskControl::new(),
        }
    }

    /// Use an externally created control, e.g. one already wired to a signal handler.
    pub fn with_control(mut self, control: TaskControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> TaskControl {
        self.control.clone()
    }

    /// Start the consumer and dispatch threads and return immediately.
    pub fn start(self) -> Result<OrchestrationHandle> {
        self.task.validate().context("invalid task record")?;
        fs::create_dir_all(&self.task.cache_dir)
            .with_context(|| format!("create cache dir {}", self.task.cache_dir.display()))?;

        let started = self.task.pending_count();
        let capacity = self.config.capacity();
        tracing::info!(
            file = %self.task.file_path.display(),
            units = self.task.units.len(),
            started,
            capacity,
            block = self.task.is_block,
            "starting task"
        );

        let task = Arc::new(self.task);
        let gate = Arc::new(AdmissionGate::new(capacity));
        let (tx, rx) = mpsc::channel();

        let consumer = Consumer {
            rx,
            gate: Arc::clone(&gate),
            listener: self.listener,
            task: Arc::clone(&task),
            tally: Tally::new(started),
            progress_interval: self.config.progress_interval(),
            last_failure: None,
        };
        let consumer = thread::Builder::new()
            .name("segload-consumer".into())
            .spawn(move || consumer.run())
            .context("spawn consumer thread")?;

        let dispatcher = Dispatcher {
            task,
            fetcher: self.fetcher,
            gate,
            control: self.control.clone(),
            tx,
            poll: self.config.gate_poll(),
        };
        let dispatcher = thread::Builder::new()
            .name("segload-dispatch".into())
            .spawn(move || dispatcher.run());
        let dispatcher = match dispatcher {
            Ok(handle) => handle,
            Err(e) => {
                // The dispatcher's sender was dropped with it, so the consumer
                // sees a closed channel and ends on its own.
                let _ = consumer.join();
                return Err(anyhow::Error::new(e).context("spawn dispatch thread"));
            }
        };

        Ok(OrchestrationHandle {
            control: self.control,
            consumer,
            dispatcher,
        })
    }

    /// Start and block until the task settles.
    pub fn run(self) -> Result<TaskOutcome> {
        self.start()?.wait()
    }
}

/// Handle on a running orchestration.
pub struct OrchestrationHandle {
    control: TaskControl,
    consumer: JoinHandle<TaskOutcome>,
    dispatcher: JoinHandle<DispatchSummary>,
}

impl OrchestrationHandle {
    pub fn control(&self) -> TaskControl {
        self.control.clone()
    }

    /// Ask the task to pause. Segment files and unit records stay for a later resume.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn cancel(&self) {
        self.control.request_cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.consumer.is_finished() && self.dispatcher.is_finished()
    }

    /// Wait for the task to settle and every thread to exit.
    pub fn wait(self) -> Result<TaskOutcome> {
        let outcome = self.consumer.join();
        if outcome.is_err() {
            // Nobody drains the channel any more; make the workers wind down.
            self.control.request_cancel();
        }
        let summary = self
            .dispatcher
            .join()
            .map_err(|_| anyhow::anyhow!("dispatch thread panicked"))?;
        tracing::debug!(?summary, "dispatch joined");
        outcome.map_err(|_| anyhow::anyhow!("event consumer thread panicked"))
    }
}
