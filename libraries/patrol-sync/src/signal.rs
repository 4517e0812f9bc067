//! Scoped subscriptions over process-wide state cells

use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Transitions buffered per subscriber before the oldest are dropped
const TRANSITION_CAPACITY: usize = 64;

/// A value with a synchronous latest-state read and a per-subscriber
/// transition log.
///
/// The `watch` side answers "what is it now"; the `broadcast` side queues
/// every change, so a subscriber that polls late still sees each step of
/// an A -> B -> A flip.
#[derive(Debug)]
pub(crate) struct StateCell<T> {
    state_tx: watch::Sender<T>,
    transitions_tx: broadcast::Sender<T>,
}

impl<T: Clone + PartialEq> StateCell<T> {
    pub(crate) fn new(initial: T) -> Self {
        let (state_tx, _) = watch::channel(initial);
        let (transitions_tx, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            state_tx,
            transitions_tx,
        }
    }

    pub(crate) fn current(&self) -> T {
        self.state_tx.borrow().clone()
    }

    /// Store `value`; returns whether it differed from the current one
    pub(crate) fn set(&self, value: T) -> bool {
        self.state_tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value.clone();
            // Sent under the watch write lock so the log order matches the state order
            let _ = self.transitions_tx.send(value.clone());
            true
        })
    }

    /// Latest-value receiver, for callers that only care about the present
    pub(crate) fn watch(&self) -> watch::Receiver<T> {
        self.state_tx.subscribe()
    }

    pub(crate) fn subscribe(&self) -> Subscription<T> {
        // Join the log before reading the state so no change falls in between
        let transitions = self.transitions_tx.subscribe();
        let initial = self.current();
        Subscription {
            initial: Some(initial),
            last: None,
            transitions,
        }
    }
}

/// A subscription to a state cell.
///
/// The value at subscription time is yielded by the first call to
/// [`Subscription::next`], then every later change in order. Dropping (or
/// calling [`Subscription::cancel`]) ends this subscription only; other
/// subscribers keep receiving updates.
#[derive(Debug)]
pub struct Subscription<T> {
    initial: Option<T>,
    last: Option<T>,
    transitions: broadcast::Receiver<T>,
}

impl<T: Clone + PartialEq> Subscription<T> {
    /// Wait for the next value. Returns `None` once the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(initial) = self.initial.take() {
            self.last = Some(initial.clone());
            return Some(initial);
        }

        loop {
            match self.transitions.recv().await {
                // A change made while subscribing can show up both as the
                // initial value and in the log
                Ok(value) if self.last.as_ref() == Some(&value) => {}
                Ok(value) => {
                    self.last = Some(value.clone());
                    return Some(value);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber fell behind, oldest transitions dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving updates
    pub fn cancel(self) {}
}
