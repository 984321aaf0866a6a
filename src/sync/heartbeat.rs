use crate::api::ExpenseService;
use crate::sync::DEFAULT_HEARTBEAT;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// Posts a keep-alive to the service on a fixed interval until dropped.
///
/// Failures are logged at `trace` and otherwise ignored; the next tick simply tries again.
#[derive(Debug)]
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// The first beat is sent one `every` after spawning. A zero interval falls back to the
    /// default.
    pub fn spawn(service: Arc<dyn ExpenseService>, every: Duration) -> Self {
        let every = if every.is_zero() {
            warn!("Heartbeat interval must be non-zero, using {DEFAULT_HEARTBEAT:?}");
            DEFAULT_HEARTBEAT
        } else {
            every
        };
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = service.heartbeat().await {
                    trace!("Heartbeat failed: {e}");
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {}
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, MemoryService};
    use crate::SyncError;
    use chrono::NaiveDate;

    #[tokio::test(start_paused = true)]
    async fn beats_until_dropped_and_survives_failures() {
        let service = Arc::new(MemoryService::new(
            NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
        ));
        service.fail_next(Endpoint::Heartbeat, SyncError::Network("offline".into()));

        let heartbeat = Heartbeat::spawn(service.clone(), Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(service.count(Endpoint::Heartbeat), 3);

        heartbeat.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.count(Endpoint::Heartbeat), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_uses_the_default() {
        let service = Arc::new(MemoryService::new(
            NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
        ));
        let _heartbeat = Heartbeat::spawn(service.clone(), Duration::ZERO);
        tokio::time::sleep(DEFAULT_HEARTBEAT * 2 + Duration::from_millis(500)).await;
        assert_eq!(service.count(Endpoint::Heartbeat), 2);
    }
}
