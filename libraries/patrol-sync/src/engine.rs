use crate::config::SyncConfig;
use crate::error::Result;
use crate::network::NetworkMonitor;
use crate::types::DrainReport;
use patrol_core::{DeliveryError, QueueItem, RemoteDelivery};
use patrol_storage::EventStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Drains the event store against the remote service.
///
/// The engine does not guard against concurrent passes itself; callers
/// (the [`SyncScheduler`](crate::SyncScheduler)) must ensure at most one
/// [`drain`](Self::drain) is in flight.
pub struct SyncEngine {
    store: Arc<EventStore>,
    remote: Arc<dyn RemoteDelivery>,
    monitor: NetworkMonitor,
    delivery_timeout: Duration,
    max_attempts: Option<u32>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<EventStore>,
        remote: Arc<dyn RemoteDelivery>,
        monitor: NetworkMonitor,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            monitor,
            delivery_timeout: config.delivery_timeout(),
            max_attempts: config.max_attempts(),
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// Run one delivery pass.
    ///
    /// Works on the snapshot taken at the start of the call; items enqueued
    /// while the pass runs are left for the next one. Items are delivered one
    /// at a time in FIFO order. Delivered items are removed; failed ones get
    /// `attempts + 1` and stay queued unless their failure is permanent or
    /// they hit the attempt cap, in which case they are dead-lettered.
    ///
    /// While offline this is a no-op that performs no remote calls.
    pub async fn drain(&self) -> Result<DrainReport> {
        if !self.monitor.is_online() {
            debug!("Offline, skipping drain");
            return Ok(DrainReport::offline(self.store.refresh_count().await?));
        }

        let start_time = Instant::now();
        let snapshot = self.store.list().await?;
        let mut report = DrainReport::default();

        debug!(items = snapshot.len(), "Starting drain pass");

        for item in &snapshot {
            if !self.monitor.is_online() {
                info!(
                    untried = snapshot.len() - report.synced - report.failed,
                    "Went offline mid-pass, stopping"
                );
                report.offline = true;
                break;
            }

            match self.deliver(item).await {
                Ok(()) => {
                    self.store.remove(item.id).await?;
                    report.synced += 1;
                    debug!(queue_id = %item.id, kind = %item.kind, "Delivered");
                }
                Err(err) => {
                    report.failed += 1;
                    if self.record_failure(item, &err).await? {
                        report.dead_lettered += 1;
                    }
                }
            }
        }

        // Re-read so rows enqueued by other connections are counted too
        report.remaining = self.store.refresh_count().await?;

        info!(
            synced = report.synced,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            remaining = report.remaining,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Drain pass complete"
        );

        Ok(report)
    }

    async fn deliver(&self, item: &QueueItem) -> std::result::Result<(), DeliveryError> {
        match tokio::time::timeout(self.delivery_timeout, self.remote.deliver(item)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::transient(format!(
                "delivery timed out after {}s",
                self.delivery_timeout.as_secs_f32()
            ))),
        }
    }

    /// Bump attempts and decide whether the item leaves rotation.
    /// Returns whether it was dead-lettered.
    async fn record_failure(&self, item: &QueueItem, err: &DeliveryError) -> Result<bool> {
        let reason = err.to_string();
        let Some(attempts) = self.store.mark_failed(item.id, &reason).await? else {
            // Purged by an operator while we were delivering it
            return Ok(false);
        };

        let exhausted = self.max_attempts.is_some_and(|max| attempts >= max);

        if err.is_permanent() || exhausted {
            error!(
                queue_id = %item.id,
                kind = %item.kind,
                attempts,
                error = %err,
                "Delivery failed for good, dead-lettering"
            );
            return Ok(self.store.dead_letter(item.id, &reason).await?);
        }

        warn!(
            queue_id = %item.id,
            kind = %item.kind,
            attempts,
            error = %err,
            "Delivery failed, will retry"
        );
        Ok(false)
    }
}
