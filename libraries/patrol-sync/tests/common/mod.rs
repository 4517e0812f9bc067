//! Shared fixtures for sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use patrol_core::{CheckpointPayload, DeliveryError, QueueId, QueueItem, RemoteDelivery};
use patrol_storage::EventStore;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// A store on a real temporary SQLite file
pub struct TestStore {
    pub store: Arc<EventStore>,
    pub url: String,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", temp_dir.path().join("sync.db").display());
        let store = EventStore::open(&url).await.expect("Failed to open event store");

        Self {
            store: Arc::new(store),
            url,
            _temp_dir: temp_dir,
        }
    }

    pub async fn enqueue_checkpoints(&self, n: usize) -> Vec<QueueId> {
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let payload = CheckpointPayload::new("patrol-1", "zone-a", format!("cp-{i}"), "04:AA");
            ids.push(self.store.enqueue_payload(&payload).await.expect("enqueue"));
        }
        ids
    }
}

/// Scripted remote that records every delivery.
///
/// Results are taken from the script in call order; once it runs out every
/// call succeeds. With a gate installed each call first waits for a permit.
#[derive(Default)]
pub struct FakeRemote {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    delivered: Mutex<Vec<QueueId>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(results: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    /// Every call blocks until a permit is added to the returned semaphore
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let remote = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (remote, gate)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of every item the remote saw, in call order
    pub fn delivered(&self) -> Vec<QueueId> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteDelivery for FakeRemote {
    async fn deliver(&self, item: &QueueItem) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delivered.lock().unwrap().push(item.id);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
