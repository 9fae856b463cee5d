//! Single-flight guard
//!
//! One guard per sync kind. A run holds the guard for its whole duration; a
//! second run of the same kind started meanwhile is turned away instead of
//! interleaving its writes with the first.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    lock: Arc<Mutex<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` when a run is already in flight.
    /// Released when the returned guard is dropped.
    pub fn try_begin(&self) -> Option<OwnedMutexGuard<()>> {
        self.lock.clone().try_lock_owned().ok()
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
