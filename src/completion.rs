//! Counted completion tracking for asynchronous publishes
//!
//! [`CompletionGroup`] is a wait group: callers [`add`](CompletionGroup::add)
//! before submitting work, each unit of work calls
//! [`done`](CompletionGroup::done) exactly once, and
//! [`wait`](CompletionGroup::wait) resolves once the count reaches zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    notify: Notify,
}

/// Cloneable wait group shared between a caller and its pending publishes.
///
/// # Examples
///
/// ```
/// use kafkit::CompletionGroup;
///
/// # #[tokio::main]
/// # async fn main() {
/// let group = CompletionGroup::new();
/// group.add(2);
///
/// let worker = group.clone();
/// tokio::spawn(async move {
///     worker.done();
///     worker.done();
/// });
///
/// group.wait().await;
/// assert_eq!(group.count(), 0);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompletionGroup {
    inner: Arc<Inner>,
}

impl CompletionGroup {
    /// Create a group with a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` outstanding units of work.
    pub fn add(&self, n: usize) {
        self.inner.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Mark one unit of work as finished.
    ///
    /// # Panics
    ///
    /// Panics if called more times than registered with [`add`](Self::add).
    pub fn done(&self) {
        let previous = self
            .inner
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));

        match previous {
            Ok(1) => self.inner.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => panic!("CompletionGroup::done called more times than add"),
        }
    }

    /// Number of outstanding units of work.
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Wait until every registered unit of work is done.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the count so a concurrent done() is not missed
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_empty() {
        let group = CompletionGroup::new();
        tokio::time::timeout(Duration::from_millis(100), group.wait())
            .await
            .expect("wait should not block on an empty group");
    }

    #[tokio::test]
    async fn test_wait_blocks_until_all_done() {
        let group = CompletionGroup::new();
        group.add(3);

        let worker = group.clone();
        let handle = tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                worker.done();
            }
        });

        tokio::time::timeout(Duration::from_secs(2), group.wait())
            .await
            .expect("group should drain");
        assert_eq!(group.count(), 0);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_is_pending_while_outstanding() {
        let group = CompletionGroup::new();
        group.add(1);

        let result = tokio::time::timeout(Duration::from_millis(50), group.wait()).await;
        assert!(result.is_err());

        group.done();
        group.wait().await;
    }

    #[test]
    #[should_panic(expected = "more times than add")]
    fn test_done_without_add_panics() {
        let group = CompletionGroup::new();
        group.done();
    }
}
