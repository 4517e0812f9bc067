use crate::error::{CoreError, Result};
use crate::types::{QueueId, QueuePayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload shape tag of a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum ItemKind {
    Checkpoint,
    ScanLog,
}

impl ItemKind {
    /// Tag as persisted and sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkpoint => "checkpoint",
            Self::ScanLog => "scanLog",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "checkpoint" => Ok(Self::Checkpoint),
            "scanLog" => Ok(Self::ScanLog),
            other => Err(CoreError::UnknownKind(other.to_string())),
        }
    }
}

/// A pending event waiting for remote confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: QueueId,
    pub kind: ItemKind,
    /// Opaque domain record; its shape is determined by `kind`
    pub payload: serde_json::Value,
    /// Capture time on the device clock
    pub created_at: DateTime<Utc>,
    /// Delivery attempts so far (only the sync engine increments this)
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Set once the item has been pulled out of retry rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_lettered_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub fn is_dead_lettered(&self) -> bool {
        self.dead_lettered_at.is_some()
    }

    /// Decode the payload into its typed record, checking the kind tag first
    pub fn decode<P: QueuePayload>(&self) -> Result<P> {
        if self.kind != P::KIND {
            return Err(CoreError::invalid_payload(
                self.kind.as_str(),
                format!("expected {} payload", P::KIND),
            ));
        }
        serde_json::from_value(self.payload.clone())
            .map_err(|e| CoreError::invalid_payload(self.kind.as_str(), e.to_string()))
    }
}
