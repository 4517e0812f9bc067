//! Patrol Agent
//!
//! Command-line host for the offline patrol write-queue: captures scans,
//! reports queue state, and runs the sync scheduler against the patrol server.

pub mod config;
pub mod device;
pub mod error;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
