//! Replay-latest broadcast cell with subscriber counting.
//!
//! A [`StateFlow`] always holds a current value. New subscribers receive that
//! value first, then every later distinct value. The publishing side,
//! [`StatePublisher`], is owned by exactly one writer; once it is dropped the
//! flow is complete and subscriptions end.

use crate::core::State;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::watch;

/// Create a flow seeded with `initial` and the publisher that drives it.
pub fn state_flow<S: State>(initial: S) -> (StatePublisher<S>, StateFlow<S>) {
    let (tx, rx) = watch::channel(initial);
    let (count_tx, _) = watch::channel(0usize);
    let flow = StateFlow {
        value: rx,
        subscribers: Arc::new(count_tx),
    };
    (StatePublisher { tx }, flow)
}

/// Write side of a [`StateFlow`].
pub struct StatePublisher<S> {
    tx: watch::Sender<S>,
}

impl<S: State> StatePublisher<S> {
    /// Publish `next` unless it equals the current value.
    ///
    /// Returns whether subscribers were notified.
    pub fn publish(&self, next: S) -> bool {
        self.tx.send_if_modified(move |current| {
            if *current == next {
                false
            } else {
                tracing::trace!(state = ?next, "publishing state");
                *current = next;
                true
            }
        })
    }

    /// The value most recently published.
    pub fn value(&self) -> S {
        self.tx.borrow().clone()
    }
}

/// Read side of a state cell: current value plus future values.
///
/// Clones observe the same cell.
pub struct StateFlow<S> {
    value: watch::Receiver<S>,
    subscribers: Arc<watch::Sender<usize>>,
}

impl<S> Clone for StateFlow<S> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<S: State> StateFlow<S> {
    /// The current value, read synchronously.
    pub fn value(&self) -> S {
        self.value.borrow().clone()
    }

    /// Start observing: the first item is the current value.
    ///
    /// The subscription counts toward [`StateFlow::subscription_count`]
    /// until it is dropped.
    pub fn subscribe(&self) -> StateSubscription<S> {
        self.subscribers.send_modify(|count| *count += 1);
        StateSubscription {
            value: self.value.clone(),
            delivered_current: false,
            guard: SubscriberGuard {
                subscribers: Arc::clone(&self.subscribers),
            },
        }
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        *self.subscribers.borrow()
    }

    /// Observe the subscription count as it changes.
    pub fn subscription_counts(&self) -> watch::Receiver<usize> {
        self.subscribers.subscribe()
    }

    /// Whether the publisher is gone and no further values will arrive.
    pub fn is_complete(&self) -> bool {
        self.value.has_changed().is_err()
    }
}

struct SubscriberGuard {
    subscribers: Arc<watch::Sender<usize>>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.subscribers
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// A live observation of a [`StateFlow`].
pub struct StateSubscription<S> {
    value: watch::Receiver<S>,
    delivered_current: bool,
    guard: SubscriberGuard,
}

impl<S: State> StateSubscription<S> {
    /// Next value: the current one on the first call, then each change.
    ///
    /// Intermediate values published faster than they are read may be
    /// conflated; the latest one is never lost. Returns `None` once the
    /// flow is complete.
    pub async fn next(&mut self) -> Option<S> {
        if !self.delivered_current {
            self.delivered_current = true;
            return Some(self.value.borrow_and_update().clone());
        }
        self.value.changed().await.ok()?;
        Some(self.value.borrow_and_update().clone())
    }

    /// Wait for the first value satisfying `predicate`, starting with the
    /// current one.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<S>
    where
        F: FnMut(&S) -> bool,
    {
        while let Some(state) = self.next().await {
            if predicate(&state) {
                return Some(state);
            }
        }
        None
    }

    /// Turn the subscription into a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = S> + Send + Unpin {
        Box::pin(stream::unfold(self, |mut subscription| async move {
            let next = subscription.next().await?;
            Some((next, subscription))
        }))
    }
}

impl<S> std::fmt::Debug for StateSubscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSubscription")
            .field("subscribers", &*self.guard.subscribers.borrow())
            .finish()
    }
}
