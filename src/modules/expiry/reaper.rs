use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use crate::api::error;
use crate::utils::Clock;

/// One class of ephemeral records the reaper purges once their deadline passes.
#[async_trait::async_trait]
pub trait ExpirySweep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError>;
}

/// Background task that deletes expired snaps, stories, quizzes and anonymous
/// chats on a fixed interval. Reads never rely on it: every read path already
/// filters on `expires_at`.
pub struct ExpiryReaper {
    sweeps: Vec<Arc<dyn ExpirySweep>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpiryReaper {
    pub fn new(sweeps: Vec<Arc<dyn ExpirySweep>>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self { sweeps, clock, interval }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once()
                        .instrument(tracing::info_span!("expiry_sweep_iteration"))
                        .await;
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Expiry reaper shutting down...");
    }

    /// Runs every sweep once. A failing sweep is logged and does not stop the others.
    pub async fn sweep_once(&self) -> u64 {
        let now = self.clock.now();
        let mut total = 0;

        for sweep in &self.sweeps {
            match sweep.purge_expired(now).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(sweep = sweep.name(), count = %count, "Purged expired records");
                    }
                    total += count;
                }
                Err(e) => tracing::error!(sweep = sweep.name(), error = ?e, "Expiry sweep failed"),
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::test::FixedClock;

    struct Counting {
        calls: AtomicU64,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ExpirySweep for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, error::SystemError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(error::SystemError::DatabaseError("down".into()))
            } else {
                Ok(2)
            }
        }
    }

    #[tokio::test]
    async fn test_failing_sweep_does_not_block_the_rest() {
        let broken = Arc::new(Counting { calls: AtomicU64::new(0), fail: true });
        let healthy = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let reaper = ExpiryReaper::new(
            vec![broken.clone() as Arc<dyn ExpirySweep>, healthy.clone() as Arc<dyn ExpirySweep>],
            Arc::new(FixedClock::default()),
            Duration::from_secs(60),
        );

        assert_eq!(reaper.sweep_once().await, 2);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let healthy = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let reaper = ExpiryReaper::new(
            vec![healthy.clone() as Arc<dyn ExpirySweep>],
            Arc::new(FixedClock::default()),
            Duration::from_millis(5),
        );
        let (tx, rx) = tokio::sync::watch::channel(false);

        let task = tokio::spawn(reaper.run(rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert!(healthy.calls.load(Ordering::SeqCst) >= 1);
    }
}
