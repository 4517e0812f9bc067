//! Sync scheduler
//!
//! Turns four independent trigger sources into serialized calls to
//! [`SyncEngine::drain`]:
//!
//! 1. a fixed-interval timer (skipped while offline, empty or backing off)
//! 2. the offline -> online edge of the [`NetworkMonitor`]
//! 3. the background -> foreground edge of the [`AppLifecycle`]
//! 4. explicit [`SyncScheduler::sync`] calls
//!
//! Background triggers only fire when there is pending work and the device
//! is online. The pending count is re-read from the database before each
//! background decision, since other processes may enqueue into the same
//! file. Manual calls skip the pending-work check. All of them share a
//! single-flight guard: a call that arrives while a pass is running gets
//! [`SyncOutcome::Busy`] back instead of starting a second pass.

use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::error::Result;
use crate::lifecycle::AppLifecycle;
use crate::signal::Subscription;
use crate::types::{SchedulerStatus, SyncOutcome, SyncTrigger};
use chrono::{DateTime, Utc};
use patrol_core::{AppVisibility, NetworkState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the trigger subscriptions and the single-flight guard.
///
/// Created with [`SyncScheduler::start`]; every trigger is released by
/// [`SyncScheduler::shutdown`] (or by dropping the scheduler).
pub struct SyncScheduler {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    engine: SyncEngine,
    config: SyncConfig,
    syncing: AtomicBool,
    status_tx: watch::Sender<SchedulerStatus>,
}

impl SyncScheduler {
    /// Wire up all triggers and start the timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(engine: SyncEngine, lifecycle: &AppLifecycle, config: SyncConfig) -> Self {
        let (status_tx, _) = watch::channel(SchedulerStatus {
            pending_count: engine.store().count(),
            ..SchedulerStatus::default()
        });

        let inner = Arc::new(Inner {
            engine,
            config,
            syncing: AtomicBool::new(false),
            status_tx,
        });
        let cancel = CancellationToken::new();

        // Subscribe here rather than in the tasks so transitions reported
        // before a task first runs are still queued for it
        let network = inner.engine.monitor().start_monitoring();
        let visibility = lifecycle.subscribe();

        let mut tasks = vec![
            tokio::spawn(run_timer(inner.clone(), cancel.clone())),
            tokio::spawn(watch_network(inner.clone(), network, cancel.clone())),
            tokio::spawn(watch_lifecycle(inner.clone(), visibility, cancel.clone())),
            tokio::spawn(mirror_pending_count(inner.clone(), cancel.clone())),
        ];

        if inner.config.sync_on_start {
            let inner = inner.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                run_cancellable(&inner, SyncTrigger::Startup, &cancel).await;
            }));
        }

        info!(
            interval_secs = inner.config.interval_secs,
            pending = inner.engine.store().count(),
            "Sync scheduler started"
        );

        Self {
            inner,
            cancel,
            tasks: Mutex::new(tasks),
        }
    }

    /// Manual trigger ("sync now").
    ///
    /// Runs even when nothing is pending, but never alongside another pass:
    /// returns [`SyncOutcome::Busy`] immediately if one is in flight. Engine
    /// errors are returned to the caller.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        self.inner.run(SyncTrigger::Manual).await
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.engine.store().count()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Release every trigger and wait for the trigger tasks to exit.
    ///
    /// A background pass in flight is abandoned at its next await point. The
    /// item it was delivering stays queued and goes out again, under the same
    /// idempotency key, on the next pass. Manual [`sync`](Self::sync) calls
    /// are owned by their callers and are not interrupted.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            let _ = task.await;
        }
        info!("Sync scheduler stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        let tasks = self.tasks.get_mut().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Inner {
    /// Single entry point for every trigger
    async fn run(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(?trigger, "Sync already in progress, coalescing");
            return Ok(SyncOutcome::Busy);
        }
        let _guard = SyncingGuard { inner: self };

        self.status_tx.send_modify(|status| {
            status.is_syncing = true;
            status.last_trigger = Some(trigger);
            status.last_trigger_at = Some(Utc::now());
        });

        debug!(?trigger, "Starting sync");
        let result = self.engine.drain().await;
        let now = Utc::now();
        let pending = self.engine.store().count();

        self.status_tx.send_modify(|status| {
            status.last_sync_at = Some(now);
            status.pending_count = pending;

            match &result {
                Ok(report) => {
                    if report.is_unproductive() {
                        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                        status.backoff_until = Some(self.backoff_deadline(now, status.consecutive_failures));
                    } else {
                        status.consecutive_failures = 0;
                        status.backoff_until = None;
                    }
                    status.last_report = Some(report.clone());
                    status.last_error = None;
                }
                Err(err) => {
                    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                    status.backoff_until = Some(self.backoff_deadline(now, status.consecutive_failures));
                    status.last_error = Some(err.to_string());
                }
            }
        });

        result.map(SyncOutcome::Completed)
    }

    fn backoff_deadline(&self, now: DateTime<Utc>, consecutive_failures: u32) -> DateTime<Utc> {
        let backoff = self.config.backoff_for(consecutive_failures);
        now + chrono::Duration::seconds(backoff.as_secs() as i64)
    }

    /// Guarded run for timer/edge triggers. Errors are logged, never propagated.
    async fn background(&self, trigger: SyncTrigger) {
        if !self.engine.monitor().is_online() {
            debug!(?trigger, "Offline, skipping");
            return;
        }
        let pending = match self.engine.store().refresh_count().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(?trigger, error = %e, "Could not read pending count, skipping");
                return;
            }
        };
        if pending == 0 {
            debug!(?trigger, "Nothing pending, skipping");
            return;
        }
        if trigger == SyncTrigger::Timer {
            let in_backoff = self.status_tx.borrow().in_backoff(Utc::now());
            if in_backoff {
                debug!("Backing off, skipping timer sync");
                return;
            }
        }

        match self.run(trigger).await {
            Ok(SyncOutcome::Completed(report)) => {
                debug!(?trigger, synced = report.synced, failed = report.failed, "Background sync done");
            }
            Ok(SyncOutcome::Busy) => {}
            Err(e) => warn!(?trigger, error = %e, "Background sync failed"),
        }
    }
}

/// Resets the single-flight flag on every exit path, including cancellation
struct SyncingGuard<'a> {
    inner: &'a Inner,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.inner.syncing.store(false, Ordering::Release);
        self.inner.status_tx.send_modify(|status| status.is_syncing = false);
    }
}

/// Background pass that gives way to shutdown
async fn run_cancellable(inner: &Inner, trigger: SyncTrigger, cancel: &CancellationToken) {
    tokio::select! {
        () = cancel.cancelled() => debug!(?trigger, "Background sync interrupted by shutdown"),
        () = inner.background(trigger) => {}
    }
}

async fn run_timer(inner: Arc<Inner>, cancel: CancellationToken) {
    let period = inner.config.interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => run_cancellable(&inner, SyncTrigger::Timer, &cancel).await,
        }
    }
}

async fn watch_network(
    inner: Arc<Inner>,
    mut subscription: Subscription<NetworkState>,
    cancel: CancellationToken,
) {
    // The first value is the state at subscription time, not a transition
    let mut was_online: Option<bool> = None;

    loop {
        let state = tokio::select! {
            () = cancel.cancelled() => break,
            state = subscription.next() => state,
        };
        let Some(state) = state else { break };

        let online = state.is_online();
        if was_online == Some(false) && online {
            info!("Reconnected");
            run_cancellable(&inner, SyncTrigger::Reconnect, &cancel).await;
        }
        was_online = Some(online);
    }
}

async fn watch_lifecycle(
    inner: Arc<Inner>,
    mut subscription: Subscription<AppVisibility>,
    cancel: CancellationToken,
) {
    let mut previous: Option<AppVisibility> = None;

    loop {
        let visibility = tokio::select! {
            () = cancel.cancelled() => break,
            visibility = subscription.next() => visibility,
        };
        let Some(visibility) = visibility else { break };

        if previous == Some(AppVisibility::Background) && visibility == AppVisibility::Foreground {
            run_cancellable(&inner, SyncTrigger::Foreground, &cancel).await;
        }
        previous = Some(visibility);
    }
}

async fn mirror_pending_count(inner: Arc<Inner>, cancel: CancellationToken) {
    let mut counts = inner.engine.store().watch_count();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = counts.changed() => {
                if changed.is_err() {
                    break;
                }
                let pending = *counts.borrow_and_update();
                inner.status_tx.send_modify(|status| status.pending_count = pending);
            }
        }
    }
}
