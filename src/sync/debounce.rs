use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Last-write-wins delay. Each call to `settle` supersedes every call still waiting.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Claims the latest slot now, superseding every earlier `Pending`.
    pub fn pending(&self) -> Pending {
        Pending {
            ticket: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
            latest: self.latest.clone(),
            delay: self.delay,
        }
    }

    /// Waits out the delay. Returns `true` if no later call arrived in the meantime.
    pub async fn settle(&self) -> bool {
        self.pending().settle().await
    }
}

/// A claimed slot of a `Debouncer`.
#[derive(Debug)]
pub struct Pending {
    ticket: u64,
    latest: Arc<AtomicU64>,
    delay: Duration,
}

impl Pending {
    /// Waits out the delay. Returns `true` if the slot was not superseded in the meantime.
    pub async fn settle(self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.latest.load(Ordering::SeqCst) == self.ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_call_settles() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let (a, b, c) = tokio::join!(debouncer.settle(), debouncer.settle(), debouncer.settle());
        assert_eq!((a, b, c), (false, false, true));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_outside_the_window_both_settle() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        assert!(debouncer.settle().await);
        assert!(debouncer.settle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn slots_are_ordered_by_claim_not_by_poll() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let first = debouncer.pending();
        let second = debouncer.pending();
        let (second, first) = tokio::join!(second.settle(), first.settle());
        assert!(second);
        assert!(!first);
    }

    #[tokio::test(start_paused = true)]
    async fn a_later_call_supersedes_a_waiting_one() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let first = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.settle().await }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(debouncer.settle().await);
        assert!(!first.await.unwrap());
    }
}
