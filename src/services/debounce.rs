//! Keyed, cancellable timers.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delays work until input has settled.
///
/// Scheduling under a key cancels whatever was still waiting under that key.
/// Once the delay has elapsed the work runs detached: cancelling or
/// rescheduling afterwards never interrupts it.
///
/// Must be used from within a Tokio runtime.
pub struct Debouncer<K> {
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> Debouncer<K> {
    /// Creates a debouncer with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`, replacing any pending task under `key`.
    pub fn schedule<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        });

        if let Some(previous) = self.lock().insert(key, timer) {
            previous.abort();
        }
    }

    /// Cancels the pending task under `key`.
    ///
    /// Returns whether a task was still waiting.
    pub fn cancel(&self, key: &K) -> bool {
        match self.lock().remove(key) {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    /// Returns whether a task is waiting under `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|timer| !timer.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, timer) in pending.drain() {
            timer.abort();
        }
    }
}
