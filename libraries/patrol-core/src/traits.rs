//! Collaborator traits
//!
//! The sync core never talks to the network directly. Remote writes and
//! reachability checks go through these seams so that tests and different
//! hosts can plug in their own transport.

use crate::error::DeliveryError;
use crate::types::{NetworkState, QueueItem};
use async_trait::async_trait;

/// Delivers a single queued item to the remote service.
///
/// Implementations must send `item.id` as the idempotency key so a retried
/// write that already succeeded server-side is recognized as a duplicate.
#[async_trait]
pub trait RemoteDelivery: Send + Sync {
    /// Attempt delivery; `Ok(())` means the remote accepted (or already had) the item
    async fn deliver(&self, item: &QueueItem) -> Result<(), DeliveryError>;
}

/// Platform connectivity signal
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Check connectivity and internet reachability right now
    async fn probe(&self) -> NetworkState;
}
