//! Admission gate: fixed pool of worker tokens.
//!
//! The dispatch loop takes a token before launching a fetch worker; the event
//! consumer gives it back when that worker reports a terminal outcome. The
//! count lives behind a mutex and releases signal a condition variable, so a
//! release that races with a waiter is never lost.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Bounded token pool. Shared between the dispatch thread and the event consumer.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    in_use: Mutex<usize>,
    freed: Condvar,
}

impl AdmissionGate {
    /// Create a gate with `capacity` tokens (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently held.
    pub fn in_use(&self) -> usize {
        *self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tokens free right now. Only a hint; another thread may take them.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.in_use())
    }

    /// Block until a token is free, then take it.
    pub fn acquire(&self) {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_use >= self.capacity {
            in_use = self.freed.wait(in_use).unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
    }

    /// Take a token if one is free without waiting.
    pub fn try_acquire(&self) -> bool {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        if *in_use >= self.capacity {
            return false;
        }
        *in_use += 1;
        true
    }

    /// Wait at most `timeout` for a token. Returns false if none freed in time.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_use >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .freed
                .wait_timeout(in_use, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            in_use = guard;
        }
        *in_use += 1;
        true
    }

    /// Return one token and wake one waiter. Extra releases are ignored.
    pub fn release(&self) {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        if *in_use == 0 {
            tracing::warn!("admission gate released with no token held");
            return;
        }
        *in_use -= 1;
        drop(in_use);
        self.freed.notify_one();
    }
}
