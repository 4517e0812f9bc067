use serde::{Deserialize, Serialize};

/// Device connectivity as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    /// A network interface is up
    pub is_connected: bool,
    /// The internet (or the configured server) answers
    pub is_internet_reachable: bool,
}

impl NetworkState {
    pub const OFFLINE: Self = Self::new(false, false);
    pub const ONLINE: Self = Self::new(true, true);

    pub const fn new(is_connected: bool, is_internet_reachable: bool) -> Self {
        Self {
            is_connected,
            is_internet_reachable,
        }
    }

    /// Sync is only attempted when both flags hold
    pub const fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable
    }
}

/// Whether the host application is in front of the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppVisibility {
    Foreground,
    Background,
}
