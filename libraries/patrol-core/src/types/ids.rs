/// ID types for queued entities
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Queue item identifier.
///
/// Assigned by the event store at enqueue time and never reused, even after
/// the item is deleted. Doubles as the idempotency key for remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(i64);

impl QueueId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for QueueId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for QueueId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
