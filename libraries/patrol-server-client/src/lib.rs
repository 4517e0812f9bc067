//! Patrol Server Client
//!
//! HTTP transport for the offline write-queue.
//!
//! # Features
//!
//! - **Delivery**: [`PatrolApiClient`] implements [`patrol_core::RemoteDelivery`],
//!   sending each queued item with an idempotency key and classifying
//!   failures as transient or permanent
//! - **Reachability**: [`HttpReachability`] implements
//!   [`patrol_core::ReachabilityProbe`] against the server health endpoint
//!
//! # Example
//!
//! ```ignore
//! use patrol_server_client::{ClientConfig, HttpReachability, PatrolApiClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("https://patrol.example.com");
//! let remote = Arc::new(PatrolApiClient::new(config.clone())?);
//! let probe = Arc::new(HttpReachability::new(&config.base_url, Duration::from_secs(5))?);
//!
//! let engine = SyncEngine::new(store, remote, monitor.clone(), &sync_config);
//! let _probe = monitor.spawn_probe(probe, Duration::from_secs(30));
//! ```

mod client;
mod error;
mod reachability;
mod types;

pub use client::{PatrolApiClient, IDEMPOTENCY_HEADER};
pub use error::{Result, ServerClientError};
pub use reachability::HttpReachability;
pub use types::{ClientConfig, DeliveryRequest};
