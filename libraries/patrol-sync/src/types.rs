use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered a sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Manual,     // User pressed "sync now"
    Timer,      // Periodic interval elapsed
    Reconnect,  // Network went from offline to online
    Foreground, // App came back to the foreground
    Startup,    // Scheduler just started
}

/// Result of one drain pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Items confirmed by the remote and removed
    pub synced: usize,
    /// Items whose delivery failed in this pass (including dead-lettered ones)
    pub failed: usize,
    /// Failed items that were moved out of rotation in this pass
    pub dead_lettered: usize,
    /// Active items left after the pass, including ones enqueued mid-pass
    pub remaining: usize,
    /// The pass was skipped or cut short because the device was offline
    pub offline: bool,
}

impl DrainReport {
    /// The no-op result of draining while offline
    pub fn offline(remaining: usize) -> Self {
        Self {
            remaining,
            offline: true,
            ..Self::default()
        }
    }

    /// Whether the pass made no progress despite trying
    pub fn is_unproductive(&self) -> bool {
        self.synced == 0 && self.failed > 0
    }
}

/// Outcome of a scheduler `sync()` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The engine ran and produced this report
    Completed(DrainReport),
    /// Another pass was already in flight; nothing was started
    Busy,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Busy => None,
        }
    }
}

/// Observable scheduler state for UI badges and diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub is_syncing: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub pending_count: usize,
    pub last_report: Option<DrainReport>,
    pub last_error: Option<String>,
    pub last_trigger: Option<SyncTrigger>,
    pub last_trigger_at: Option<DateTime<Utc>>,
    /// Unproductive passes in a row; drives the timer backoff
    pub consecutive_failures: u32,
    /// Timer triggers are skipped until this instant
    pub backoff_until: Option<DateTime<Utc>>,
}

impl SchedulerStatus {
    pub fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until.is_some_and(|until| now < until)
    }
}
