//! Rate limiter for outbound activity updates.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Runs an action at most once per `delay`; calls inside the window are dropped.
///
/// The gate has its own lock so a check never waits on the state machine.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Claim the current window. Returns `false` if another call already did.
    ///
    /// Check and update happen under one lock, so two racing callers can never
    /// both pass for the same window.
    pub fn try_claim(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last
            && now.duration_since(previous) < self.delay
        {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Run `action` if the gate is open.
    pub fn attempt<T>(&self, action: impl FnOnce() -> T) -> Option<T> {
        if self.try_claim() {
            Some(action())
        } else {
            tracing::trace!(delay_ms = self.delay.as_millis(), "Debounced update");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn at_most_one_action_per_window() {
        let gate = Debouncer::new(Duration::from_secs(2));
        let runs = AtomicU32::new(0);
        let bump = || runs.fetch_add(1, Ordering::SeqCst);

        assert!(gate.attempt(bump).is_some());
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(gate.attempt(bump).is_none());
        tokio::time::advance(Duration::from_millis(1499)).await;
        assert!(gate.attempt(bump).is_none());

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reopens_after_inactivity() {
        let gate = Debouncer::new(Duration::from_secs(2));
        assert_eq!(gate.attempt(|| 1), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(gate.attempt(|| 2), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_calls_do_not_extend_the_window() {
        let gate = Debouncer::new(Duration::from_secs(2));
        assert!(gate.try_claim());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!gate.try_claim());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(gate.try_claim());
    }

    #[test]
    fn zero_delay_never_drops() {
        let gate = Debouncer::new(Duration::ZERO);
        assert!((0..5).all(|_| gate.try_claim()));
    }

    #[test]
    fn concurrent_callers_pass_once() {
        let gate = Arc::new(Debouncer::new(Duration::from_secs(3600)));
        let passed = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let passed = Arc::clone(&passed);
                std::thread::spawn(move || {
                    if gate.try_claim() {
                        passed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(passed.load(Ordering::SeqCst), 1);
    }
}
