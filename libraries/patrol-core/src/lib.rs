//! Patrol Core
//!
//! Platform-agnostic types, traits, and error handling for the patrol
//! offline write-queue.
//!
//! This crate provides the building blocks shared by the storage layer, the
//! sync engine and the HTTP client.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `QueueItem`, `ItemKind`, `CheckpointPayload`, `ScanLogPayload`, `NetworkState`
//! - **Collaborator Traits**: `RemoteDelivery`, `ReachabilityProbe`
//! - **Error Handling**: `CoreError` and the `DeliveryError` outcome taxonomy
//!
//! # Example
//!
//! ```rust
//! use patrol_core::{CheckpointPayload, ItemKind, NetworkState};
//!
//! let payload = CheckpointPayload::new("patrol-7", "zone-b", "cp-12", "04:A2:19:7F");
//! assert_eq!(ItemKind::Checkpoint.as_str(), "checkpoint");
//!
//! let state = NetworkState::new(true, false);
//! assert!(!state.is_online());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, DeliveryError, Result};
pub use traits::{ReachabilityProbe, RemoteDelivery};
pub use types::{
    AppVisibility, CheckpointPayload, ItemKind, NetworkState, QueueId, QueueItem, QueuePayload,
    ScanLogPayload,
};
