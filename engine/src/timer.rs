//! Resettable one-shot timers.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single pending callback that can be pushed back or cancelled.
///
/// `reset` and `stop` abort the previous task without waiting for it. If the
/// callback has already started it may be cut short at its next await point;
/// work it completed before that stays done.
#[derive(Debug)]
pub struct OneShotTimer {
    name: &'static str,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl OneShotTimer {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    /// Cancel any pending fire and schedule `fire` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reset<F>(&self, delay: Duration, fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = self.name;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(timer = name, "Timer fired");
            fire.await;
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.abort();
            tracing::trace!(timer = self.name, "Timer stopped");
        }
    }

    /// Whether a fire is still scheduled or running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}
