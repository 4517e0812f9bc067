//! Patrol server write client.

use crate::error::{Result, ServerClientError};
use crate::types::{ClientConfig, DeliveryRequest};
use async_trait::async_trait;
use patrol_core::{DeliveryError, ItemKind, QueueItem, RemoteDelivery};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the per-item idempotency key
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Delivers queued items to the patrol server over HTTP.
///
/// A 409 Conflict means the server already has the item (an earlier attempt
/// succeeded but its response was lost) and counts as delivered.
///
/// # Example
///
/// ```ignore
/// use patrol_server_client::{ClientConfig, PatrolApiClient};
///
/// let config = ClientConfig::new("https://patrol.example.com").with_token("secret");
/// let client = PatrolApiClient::new(config)?;
/// client.submit(&item).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PatrolApiClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
    device_id: String,
}

impl PatrolApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("PatrolAgent/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            access_token: config.access_token,
            device_id: config.device_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Idempotency key for an item: stable across retries and restarts
    pub fn idempotency_key(&self, item: &QueueItem) -> String {
        format!("{}:{}", self.device_id, item.id)
    }

    /// Endpoint that accepts items of `kind`
    pub fn endpoint(&self, kind: ItemKind) -> Result<String> {
        let path = match kind {
            ItemKind::Checkpoint => "checkpoints",
            ItemKind::ScanLog => "scan-logs",
            other => return Err(ServerClientError::UnsupportedKind(other.to_string())),
        };
        Ok(format!("{}/api/{}", self.base_url, path))
    }

    /// Send one item. Ok means accepted now or previously.
    pub async fn submit(&self, item: &QueueItem) -> Result<()> {
        let url = self.endpoint(item.kind)?;
        let body = DeliveryRequest::from(item);

        debug!(url = %url, queue_id = %item.id, kind = %item.kind, "Submitting item");

        let mut request = self
            .http
            .post(&url)
            .header(IDEMPOTENCY_HEADER, self.idempotency_key(item))
            .json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::CONFLICT {
            debug!(queue_id = %item.id, "Server already has item");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        warn!(
            queue_id = %item.id,
            status = status.as_u16(),
            message = %message,
            "Server rejected item"
        );

        Err(ServerClientError::ServerError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteDelivery for PatrolApiClient {
    async fn deliver(&self, item: &QueueItem) -> std::result::Result<(), DeliveryError> {
        self.submit(item).await.map_err(DeliveryError::from)
    }
}

/// Trim and validate a base URL; only http(s) is accepted
pub(crate) fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServerClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    Ok(trimmed.to_string())
}
