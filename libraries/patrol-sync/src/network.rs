//! Network monitor
//!
//! Holds the last known connectivity state and fans transitions out to
//! subscribers. The monitor only reports state; deciding what counts as a
//! "reconnect" is up to the consumer.

use crate::signal::{StateCell, Subscription};
use patrol_core::{NetworkState, ReachabilityProbe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Process-wide connectivity state. Cheap to clone; clones share the state.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    state: Arc<StateCell<NetworkState>>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkState) -> Self {
        Self {
            state: Arc::new(StateCell::new(initial)),
        }
    }

    /// Last known state. Never blocks.
    pub fn current(&self) -> NetworkState {
        self.state.current()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Platform callback entry point.
    ///
    /// Subscribers are only notified when the state actually changes.
    /// Returns whether it did.
    pub fn report(&self, state: NetworkState) -> bool {
        let changed = self.state.set(state);

        if changed {
            if state.is_online() {
                info!(?state, "Network online");
            } else {
                warn!(?state, "Network offline");
            }
        }
        changed
    }

    /// Subscribe to connectivity.
    ///
    /// The current state is emitted immediately, then every transition in
    /// order, even ones reported faster than the subscriber polls. Safe to
    /// call any number of times; each subscription is independent.
    pub fn start_monitoring(&self) -> Subscription<NetworkState> {
        self.state.subscribe()
    }

    /// Resolve as soon as the device is online (immediately if it already is).
    ///
    /// Read paths await this to pause requests while offline.
    pub async fn wait_until_online(&self) {
        let mut rx = self.state.watch();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(NetworkState::is_online).await;
    }

    /// Poll `probe` every `interval` and report what it sees.
    ///
    /// The first probe runs immediately. Must be called from within a Tokio runtime.
    pub fn spawn_probe(&self, probe: Arc<dyn ReachabilityProbe>, interval: Duration) -> ProbeHandle {
        let cancel = CancellationToken::new();
        let monitor = self.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            debug!(?interval, "Reachability probe started");
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    state = probe.probe() => {
                        monitor.report(state);
                    }
                }

                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
            debug!("Reachability probe stopped");
        });

        ProbeHandle {
            cancel,
            handle: Some(handle),
        }
    }
}

impl Default for NetworkMonitor {
    /// Starts offline until the platform says otherwise
    fn default() -> Self {
        Self::new(NetworkState::OFFLINE)
    }
}

/// Cancellation handle for a reachability polling task.
///
/// Dropping the handle also stops the task.
#[derive(Debug)]
pub struct ProbeHandle {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProbeHandle {
    /// Stop polling and wait for the task to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
