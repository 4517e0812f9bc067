//! Types for patrol server API requests and client configuration.

use chrono::{DateTime, Utc};
use patrol_core::{ItemKind, QueueId, QueueItem};
use serde::{Deserialize, Serialize};

/// Configuration for connecting to the patrol server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server (e.g., "https://patrol.example.com")
    pub base_url: String,
    /// Bearer token sent with every write (if any)
    #[serde(default)]
    pub access_token: Option<String>,
    /// Stable id of this device; namespaces idempotency keys
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl ClientConfig {
    /// Create a config with just the URL and a fresh device id.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            device_id: default_device_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }
}

/// Body of a checkpoint or scan-log write.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub queue_id: QueueId,
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl From<&QueueItem> for DeliveryRequest {
    fn from(item: &QueueItem) -> Self {
        Self {
            queue_id: item.id,
            kind: item.kind,
            created_at: item.created_at,
            payload: item.payload.clone(),
        }
    }
}
