//! Patrol Sync
//!
//! Offline write-queue synchronization: decides *when* the durable event
//! queue is drained against the remote service and makes sure at most one
//! drain runs at a time.
//!
//! # Components
//!
//! - [`NetworkMonitor`]: last known connectivity, transition subscriptions, reachability polling
//! - [`AppLifecycle`]: foreground/background signal fed by the host
//! - [`SyncEngine`]: one FIFO delivery pass over a queue snapshot
//! - [`SyncScheduler`]: timer, reconnect, foreground and manual triggers with single-flight and backoff
//! - [`CaptureApi`]: write-time entry point used by the scanning UI
//!
//! # Example
//!
//! ```rust,no_run
//! use patrol_core::{CheckpointPayload, NetworkState, RemoteDelivery};
//! use patrol_storage::EventStore;
//! use patrol_sync::{AppLifecycle, CaptureApi, NetworkMonitor, SyncConfig, SyncEngine, SyncScheduler};
//! use std::sync::Arc;
//!
//! # async fn example(remote: Arc<dyn RemoteDelivery>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(EventStore::open("sqlite://patrol.db").await?);
//! let monitor = NetworkMonitor::new(NetworkState::OFFLINE);
//! let lifecycle = AppLifecycle::new();
//! let config = SyncConfig::default();
//!
//! let engine = SyncEngine::new(store.clone(), remote, monitor.clone(), &config);
//! let scheduler = SyncScheduler::start(engine, &lifecycle, config);
//!
//! let capture = CaptureApi::new(store);
//! capture
//!     .save_checkpoint(CheckpointPayload::new("patrol-1", "zone-a", "cp-1", "04:AA"))
//!     .await?;
//!
//! // Platform connectivity callback: the reconnect edge drains the queue
//! monitor.report(NetworkState::ONLINE);
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod capture;
mod config;
mod engine;
mod error;
mod lifecycle;
mod network;
mod scheduler;
mod signal;
mod types;

// Public exports
pub use capture::{CaptureApi, CaptureReceipt};
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use lifecycle::AppLifecycle;
pub use network::{NetworkMonitor, ProbeHandle};
pub use scheduler::SyncScheduler;
pub use signal::Subscription;
pub use types::{DrainReport, SchedulerStatus, SyncOutcome, SyncTrigger};
