//! Bounds the number of connections served at once.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::ShutdownFlag;

const SHUTDOWN_POLL: Duration = Duration::from_millis(25);

/// Counting gate; `None` admits everything.
#[derive(Debug)]
pub(crate) struct AdmissionGate {
    limit: Option<usize>,
    active: Mutex<usize>,
    released: Condvar,
}

impl AdmissionGate {
    pub(crate) fn new(limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            limit,
            active: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Blocks until a slot is free. Returns `None` once `shutdown` is
    /// triggered.
    pub(crate) fn acquire(self: &Arc<Self>, shutdown: &ShutdownFlag) -> Option<Permit> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if shutdown.is_triggered() {
                return None;
            }
            if self.limit.is_none_or(|limit| *active < limit) {
                *active += 1;
                return Some(Permit {
                    gate: Arc::clone(self),
                });
            }
            active = self
                .released
                .wait_timeout(active, SHUTDOWN_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub(crate) fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Blocks until every permit has been released.
    pub(crate) fn wait_idle(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        while *active > 0 {
            active = self
                .released
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn active(&self) -> usize {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        self.released.notify_all();
    }
}

/// One admitted connection; frees its slot on drop.
#[derive(Debug)]
pub(crate) struct Permit {
    gate: Arc<AdmissionGate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
