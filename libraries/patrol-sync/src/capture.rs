//! Capture API
//!
//! Write-time entry point for the scanning UI. Both calls return as soon as
//! the record is durable; delivery is left to the scheduler.

use crate::error::{Result, SyncError};
use patrol_core::{CheckpointPayload, QueueId, QueuePayload, ScanLogPayload};
use patrol_storage::EventStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Acknowledgement handed back to the UI once a scan is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReceipt {
    pub success: bool,
    pub queue_id: QueueId,
}

#[derive(Debug, Clone)]
pub struct CaptureApi {
    store: Arc<EventStore>,
}

impl CaptureApi {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    /// Queue a scanned checkpoint
    pub async fn save_checkpoint(&self, payload: CheckpointPayload) -> Result<CaptureReceipt> {
        require("patrolId", &payload.patrol_id)?;
        require("zoneId", &payload.zone_id)?;
        require("checkpointId", &payload.checkpoint_id)?;
        require("tagId", &payload.tag_id)?;

        self.save(&payload).await
    }

    /// Queue a patrol log entry
    pub async fn save_log(&self, payload: ScanLogPayload) -> Result<CaptureReceipt> {
        require("patrolId", &payload.patrol_id)?;
        require("tagId", &payload.tag_id)?;
        require("event", &payload.event)?;

        self.save(&payload).await
    }

    async fn save<P: QueuePayload>(&self, payload: &P) -> Result<CaptureReceipt> {
        let queue_id = self.store.enqueue_payload(payload).await.map_err(|e| {
            error!(kind = %P::KIND, error = %e, "Scan not saved");
            e
        })?;

        debug!(queue_id = %queue_id, kind = %P::KIND, "Scan saved");
        Ok(CaptureReceipt {
            success: true,
            queue_id,
        })
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::InvalidPayload(format!("{field} must not be empty")));
    }
    Ok(())
}
