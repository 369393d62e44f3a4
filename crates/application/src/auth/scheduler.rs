//! Cancellable refresh timer.
//!
//! At most one timer is outstanding per scheduler. Arming replaces the
//! pending timer; a timer that already started firing is no longer pending
//! and cannot be cancelled.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use cadence_domain::TokenSet;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

/// Delay until a refresh of `tokens` is due, `margin` before expiry.
///
/// Already-due refreshes yield a zero delay.
#[must_use]
pub fn refresh_delay(tokens: &TokenSet, now: DateTime<Utc>, margin: Duration) -> StdDuration {
    (tokens.refresh_due_at(margin) - now)
        .to_std()
        .unwrap_or(StdDuration::ZERO)
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Single-timer scheduler backed by a tokio task.
#[derive(Default)]
pub struct RefreshScheduler {
    slot: Arc<Mutex<Slot>>,
}

impl RefreshScheduler {
    /// Create a scheduler with no timer armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `fire` to run after `delay`, replacing any pending timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&self, delay: StdDuration, fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }

        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                // Leave the slot before firing so `fire` may re-arm.
                slot.pending = None;
            }
            fire().await;
        });
        slot.pending = Some(handle);
    }

    /// Cancels the pending timer. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        slot.pending.take().is_some_and(|handle| {
            handle.abort();
            true
        })
    }

    /// Returns true if a timer is waiting to fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.slot).pending.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("armed", &self.is_armed())
            .finish()
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::t0;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[test]
    fn test_delay_is_zero_inside_margin() {
        let tokens = TokenSet::issue("a", "r", 10, t0());
        assert_eq!(
            refresh_delay(&tokens, t0(), Duration::minutes(5)),
            StdDuration::ZERO
        );
    }

    #[test]
    fn test_delay_leads_expiry_by_margin() {
        let tokens = TokenSet::issue("a", "r", 3600, t0());
        assert_eq!(
            refresh_delay(&tokens, t0(), Duration::minutes(5)),
            StdDuration::from_secs(55 * 60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.arm(StdDuration::from_secs(60), counting(&fired));
        assert!(scheduler.is_armed());

        tokio::time::sleep(StdDuration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(StdDuration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_pending_timer() {
        let scheduler = RefreshScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        scheduler.arm(StdDuration::from_secs(10), counting(&first));
        scheduler.arm(StdDuration::from_secs(10), counting(&second));

        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.arm(StdDuration::ZERO, counting(&fired));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
