//! Payload records captured by the scanning UI

use crate::types::ItemKind;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record that can be stored in the queue under a fixed kind tag
pub trait QueuePayload: Serialize + DeserializeOwned + Send + Sync {
    const KIND: ItemKind;
}

/// An NFC checkpoint scanned during a patrol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointPayload {
    pub patrol_id: String,
    pub zone_id: String,
    pub checkpoint_id: String,
    pub tag_id: String,
    pub scanned_at: DateTime<Utc>,
}

impl CheckpointPayload {
    /// Build a checkpoint record stamped with the current device time
    pub fn new(
        patrol_id: impl Into<String>,
        zone_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        tag_id: impl Into<String>,
    ) -> Self {
        Self {
            patrol_id: patrol_id.into(),
            zone_id: zone_id.into(),
            checkpoint_id: checkpoint_id.into(),
            tag_id: tag_id.into(),
            scanned_at: Utc::now(),
        }
    }
}

impl QueuePayload for CheckpointPayload {
    const KIND: ItemKind = ItemKind::Checkpoint;
}

/// A free-form patrol log entry attached to a scanned tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLogPayload {
    pub patrol_id: String,
    pub tag_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// Short event code, e.g. "door_open" or "incident"
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl ScanLogPayload {
    pub fn new(
        patrol_id: impl Into<String>,
        tag_id: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            patrol_id: patrol_id.into(),
            tag_id: tag_id.into(),
            zone_id: None,
            event: event.into(),
            note: None,
            logged_at: Utc::now(),
        }
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl QueuePayload for ScanLogPayload {
    const KIND: ItemKind = ItemKind::ScanLog;
}
