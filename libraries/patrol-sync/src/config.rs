/// Sync scheduling and delivery configuration
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Periodic timer trigger interval
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound for a single remote delivery attempt
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,

    /// Attempts after which a transiently failing item is dead-lettered (0 = never)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First timer backoff after a pass that delivered nothing
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Attempt one background sync as soon as the scheduler starts
    #[serde(default = "default_sync_on_start")]
    pub sync_on_start: bool,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_delivery_timeout_secs() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_backoff_max_secs() -> u64 {
    900
}

fn default_sync_on_start() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            sync_on_start: default_sync_on_start(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// Dead-letter cap for transient failures, `None` when disabled
    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    /// Timer backoff after `consecutive_failures` unproductive passes.
    ///
    /// Doubles from `backoff_base_secs` and saturates at `backoff_max_secs`.
    pub fn backoff_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (consecutive_failures - 1).min(16);
        let secs = self
            .backoff_base_secs
            .saturating_mul(1u64 << exponent)
            .min(self.backoff_max_secs);
        Duration::from_secs(secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(SyncError::Config("interval_secs must be greater than 0".into()));
        }
        if self.delivery_timeout_secs == 0 {
            return Err(SyncError::Config(
                "delivery_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.backoff_base_secs > self.backoff_max_secs {
            return Err(SyncError::Config(
                "backoff_base_secs cannot exceed backoff_max_secs".into(),
            ));
        }
        Ok(())
    }
}
