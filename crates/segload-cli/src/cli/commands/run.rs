//! `segload run` – download the pending segments of a manifest.

use anyhow::{Context, Result};
use segload_core::config::SegloadConfig;
use segload_core::fetch::{CurlFetcher, RecordingFetcher};
use segload_core::listener::TaskListener;
use segload_core::orchestrator::{Orchestrator, TaskOutcome};
use segload_core::record::{JsonRecordStore, RecordStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::control_socket;

/// Prints progress ticks and the final state to the terminal.
struct ConsoleListener {
    label: String,
    total_bytes: u64,
}

impl ConsoleListener {
    fn percent(&self, done: u64) -> Option<f64> {
        (self.total_bytes > 0).then(|| done as f64 / self.total_bytes as f64 * 100.0)
    }
}

impl TaskListener for ConsoleListener {
    fn on_progress(&mut self, total_progress: u64) {
        let done_mib = total_progress as f64 / 1_048_576.0;
        match self.percent(total_progress) {
            Some(pct) => println!("  {:.1} MiB ({:.1}%)", done_mib, pct),
            None => println!("  {:.1} MiB", done_mib),
        }
    }

    fn on_stop(&mut self, total_progress: u64) {
        tracing::info!(task = %self.label, bytes = total_progress, "task stopped");
        println!("Stopped {} after {} bytes this run", self.label, total_progress);
    }

    fn on_cancel(&mut self) {
        tracing::info!(task = %self.label, "task cancelled");
        println!("Cancelled {}", self.label);
    }

    fn on_fail(&mut self, retryable: bool, cause: Option<&anyhow::Error>) {
        let hint = if retryable { " (retryable)" } else { "" };
        match cause {
            Some(e) => println!("Failed {}{}: {:#}", self.label, hint, e),
            None => println!("Failed {}{}", self.label, hint),
        }
    }

    fn on_complete(&mut self) {
        tracing::info!(task = %self.label, "task completed");
        println!("Completed {}", self.label);
    }
}

pub async fn run_task(
    cfg: &SegloadConfig,
    manifest: &Path,
    workers: Option<usize>,
    socket: Option<PathBuf>,
) -> Result<()> {
    let store = Arc::new(
        JsonRecordStore::open(manifest)
            .with_context(|| format!("open manifest {}", manifest.display()))?,
    );
    let task = store.load()?;
    let mut cfg = cfg.clone();
    if let Some(n) = workers {
        cfg.max_concurrent_workers = n;
    }
    println!(
        "{}: {} segments, {} pending, {} workers",
        task.file_path.display(),
        task.units.len(),
        task.pending_count(),
        cfg.capacity()
    );

    let listener = ConsoleListener {
        label: task.file_path.display().to_string(),
        total_bytes: task.file_length,
    };
    let fetcher = RecordingFetcher::new(
        CurlFetcher::new(cfg.fetch_or_default()),
        Arc::clone(&store) as Arc<dyn RecordStore>,
    );
    let orchestrator = Orchestrator::new(task, Arc::new(fetcher), Box::new(listener), cfg);

    let handle = orchestrator.start()?;

    // Bound after a successful start; dropping it on any return path removes the socket file.
    let socket_path = socket.or_else(|| segload_core::control::default_control_socket_path().ok());
    let _control_socket = socket_path.as_ref().and_then(|path| {
        match control_socket::ControlSocket::bind(handle.control(), path) {
            Ok(sock) => {
                tracing::debug!(path = %sock.path().display(), "control socket listening");
                Some(sock)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {}", e);
                None
            }
        }
    });

    let outcome = tokio::task::spawn_blocking(move || handle.wait())
        .await
        .context("orchestrator wait task")??;

    match outcome {
        TaskOutcome::Failed { retryable, cause } => {
            let cause = cause.unwrap_or_else(|| anyhow::anyhow!("no unit error recorded"));
            Err(cause.context(format!("task failed (retryable: {})", retryable)))
        }
        _ => Ok(()),
    }
}
