//! # Completion counter for outstanding entity tasks.
//!
//! [`WaitGroup`] counts tasks that have not permanently stopped. Every task owns a
//! [`WaitGuard`]; dropping the guard is the task's single decrement.
//!
//! ## Rules
//! - Increment **before** the task is spawned (`enter()` then move the guard in).
//! - Restarting a task takes a **new** guard before the old one is dropped, so a
//!   crash-restart cycle nets to zero without the count ever touching zero.
//! - [`WaitGroup::wait`] resolves once the count is zero.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    zero: Notify,
}

/// Process-wide counter of outstanding tasks. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one outstanding task and returns the guard that completes it.
    #[must_use = "dropping the guard immediately completes the task"]
    pub fn enter(&self) -> WaitGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        WaitGuard { wg: self.clone() }
    }

    /// Current number of outstanding tasks.
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Waits until the count is zero.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn done(&self) {
        let prev = self
            .inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.inner.zero.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::error!("wait group decremented below zero"),
        }
    }
}

/// Completion token for one outstanding task.
#[derive(Debug)]
pub struct WaitGuard {
    wg: WaitGroup,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.wg.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_on_empty_group_returns() {
        WaitGroup::new().wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_after_last_guard() {
        let wg = WaitGroup::new();
        let a = wg.enter();
        let b = wg.enter();
        assert_eq!(wg.count(), 2);

        let waiter = {
            let wg = wg.clone();
            tokio::spawn(async move { wg.wait().await })
        };

        drop(a);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(b);
        waiter.await.unwrap();
        assert_eq!(wg.count(), 0);
    }

    #[test]
    fn test_handover_never_reaches_zero() {
        let wg = WaitGroup::new();
        let first = wg.enter();
        let second = wg.enter();
        drop(first);
        assert_eq!(wg.count(), 1);
        drop(second);
        assert_eq!(wg.count(), 0);
    }
}
