//! Domain types for the offline write-queue

mod ids;
mod network;
mod payload;
mod queue_item;

pub use ids::QueueId;
pub use network::{AppVisibility, NetworkState};
pub use payload::{CheckpointPayload, QueuePayload, ScanLogPayload};
pub use queue_item::{ItemKind, QueueItem};
