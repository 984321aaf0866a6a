use std::sync::Arc;
use tokio::sync::watch;

/// A shared "work in progress" indicator.
///
/// Each `show` returns a guard; the indicator is visible while at least one guard is alive. The
/// guard hides it on drop, whichever way the work ended.
#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    depth: Arc<watch::Sender<usize>>,
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        let (tx, _) = watch::channel(0);
        Self { depth: Arc::new(tx) }
    }
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self) -> LoadingGuard {
        self.depth.send_modify(|depth| *depth += 1);
        LoadingGuard {
            depth: self.depth.clone(),
        }
    }

    pub fn is_visible(&self) -> bool {
        *self.depth.borrow() > 0
    }

    /// Watches the number of outstanding guards.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.depth.subscribe()
    }
}

#[derive(Debug)]
#[must_use = "the indicator hides as soon as the guard is dropped"]
pub struct LoadingGuard {
    depth: Arc<watch::Sender<usize>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.depth
            .send_modify(|depth| *depth = depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_while_any_guard_lives() {
        let loading = LoadingIndicator::new();
        assert!(!loading.is_visible());
        let outer = loading.show();
        let inner = loading.show();
        drop(inner);
        assert!(loading.is_visible());
        drop(outer);
        assert!(!loading.is_visible());
    }

    #[test]
    fn hidden_after_early_return() {
        fn fails(loading: &LoadingIndicator) -> Result<(), ()> {
            let _guard = loading.show();
            Err(())
        }
        let loading = LoadingIndicator::new();
        assert!(fails(&loading).is_err());
        assert!(!loading.is_visible());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let loading = LoadingIndicator::new();
        let mut rx = loading.subscribe();
        let guard = loading.show();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        drop(guard);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 0);
    }
}
