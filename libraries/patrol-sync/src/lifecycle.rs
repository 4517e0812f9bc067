//! Host application lifecycle signal

use crate::signal::{StateCell, Subscription};
use patrol_core::AppVisibility;
use std::sync::Arc;
use tracing::debug;

/// Foreground/background state as reported by the host runtime.
///
/// Cheap to clone; clones share the state.
#[derive(Debug, Clone)]
pub struct AppLifecycle {
    visibility: Arc<StateCell<AppVisibility>>,
}

impl AppLifecycle {
    /// A lifecycle that starts in the foreground
    pub fn new() -> Self {
        Self {
            visibility: Arc::new(StateCell::new(AppVisibility::Foreground)),
        }
    }

    pub fn current(&self) -> AppVisibility {
        self.visibility.current()
    }

    /// Host callback entry point; returns whether the visibility changed
    pub fn set_visibility(&self, visibility: AppVisibility) -> bool {
        let changed = self.visibility.set(visibility);

        if changed {
            debug!(?visibility, "App visibility changed");
        }
        changed
    }

    pub fn enter_foreground(&self) -> bool {
        self.set_visibility(AppVisibility::Foreground)
    }

    pub fn enter_background(&self) -> bool {
        self.set_visibility(AppVisibility::Background)
    }

    /// Current visibility first, then every change
    pub fn subscribe(&self) -> Subscription<AppVisibility> {
        self.visibility.subscribe()
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
