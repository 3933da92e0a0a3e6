//! Stop/cancel signalling for a running orchestration.
//!
//! One `TaskControl` is shared by the caller, the dispatch loop and every
//! fetch worker of a task. The caller (or the control socket) requests a stop
//! or a cancel; the dispatch loop stops launching units and workers end their
//! transfer and report Stopped or Cancelled.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const STOP: u8 = 1;
const CANCEL: u8 = 2;

/// Kind of interruption requested for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Pause: keep segment files and records so the task can resume.
    Stop,
    /// Abandon the task.
    Cancel,
}

/// Cloneable interrupt flag. A cancel overrides an earlier stop; a stop never
/// downgrades a cancel.
#[derive(Debug, Clone, Default)]
pub struct TaskControl {
    state: Arc<AtomicU8>,
}

impl TaskControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOP, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn request_cancel(&self) {
        self.state.store(CANCEL, Ordering::Release);
    }

    /// The pending interrupt, if any.
    pub fn interrupt(&self) -> Option<Interrupt> {
        match self.state.load(Ordering::Acquire) {
            STOP => Some(Interrupt::Stop),
            CANCEL => Some(Interrupt::Cancel),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt().is_some()
    }
}

/// Default path for the control socket (XDG state dir).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("segload")?.get_state_home();
    Ok(dir.join("control.sock"))
}
