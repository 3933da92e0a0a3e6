//! Task listener: how an orchestration run reports to its owner.

/// Callbacks for one orchestration run, all invoked from the event consumer
/// thread. Exactly one terminal callback (`on_stop`, `on_cancel`, `on_fail`,
/// `on_complete`) fires per run and nothing follows it.
pub trait TaskListener: Send {
    /// Periodic tick with the bytes received so far.
    fn on_progress(&mut self, _total_progress: u64) {}

    fn on_stop(&mut self, total_progress: u64);

    fn on_cancel(&mut self);

    /// `cause` is `None` when no unit error is available.
    fn on_fail(&mut self, retryable: bool, cause: Option<&anyhow::Error>);

    fn on_complete(&mut self);
}

/// Listener that only logs.
#[derive(Debug, Default)]
pub struct TracingListener {
    label: String,
}

impl TracingListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl TaskListener for TracingListener {
    fn on_progress(&mut self, total_progress: u64) {
        tracing::debug!(task = %self.label, bytes = total_progress, "progress");
    }

    fn on_stop(&mut self, total_progress: u64) {
        tracing::info!(task = %self.label, bytes = total_progress, "task stopped");
    }

    fn on_cancel(&mut self) {
        tracing::info!(task = %self.label, "task cancelled");
    }

    fn on_fail(&mut self, retryable: bool, cause: Option<&anyhow::Error>) {
        match cause {
            Some(e) => tracing::error!(task = %self.label, retryable, "task failed: {:#}", e),
            None => tracing::error!(task = %self.label, retryable, "task failed"),
        }
    }

    fn on_complete(&mut self) {
        tracing::info!(task = %self.label, "task completed");
    }
}
