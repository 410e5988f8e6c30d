//! Multicast action channel with delivery gated on a connected consumer.
//!
//! Delivery needs both a running pipeline and at least one subscriber:
//!
//! ```text
//!   Disconnected ──open() or subscribe() while open──→ Connected
//!        ↑                                                │
//!        └──────── halt() or last subscriber dropped ─────┘
//! ```
//!
//! While disconnected, sent actions wait in a bounded pending buffer; the
//! capacity and overflow policy apply to that buffer only. On connecting
//! they are handed, in order, to every subscriber registered at that moment.
//! While connected, actions go straight to each subscriber's unbounded
//! queue, so an accepted action is never dropped once a consumer exists.
//! Closing the channel rejects later sends and ends every subscription once
//! its queue drains.

use crate::holder::{HolderError, OverflowPolicy};
use futures::stream::{self, Stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

struct Subscriber<A> {
    queue: Mutex<VecDeque<A>>,
    closed: Mutex<bool>,
    notify: Notify,
}

impl<A> Subscriber<A> {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            closed: Mutex::new(false),
            notify: Notify::new(),
        }
    }

    fn close(&self) {
        *self.closed.lock() = true;
        self.notify.notify_one();
    }
}

struct ChannelState<A> {
    pending: VecDeque<A>,
    subscribers: Vec<(u64, Arc<Subscriber<A>>)>,
    next_id: u64,
    open: bool,
    connected: bool,
    closed: bool,
}

impl<A: Clone> ChannelState<A> {
    /// Hand every pending action to the current subscribers.
    fn flush(&mut self) {
        self.connected = true;
        let pending: Vec<A> = self.pending.drain(..).collect();
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "delivering pending actions");
        }
        for (_, subscriber) in &self.subscribers {
            subscriber.queue.lock().extend(pending.iter().cloned());
            subscriber.notify.notify_one();
        }
    }
}

/// Producer handle for actions. Clones share the channel.
pub struct ActionChannel<A> {
    state: Arc<Mutex<ChannelState<A>>>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl<A> Clone for ActionChannel<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            capacity: self.capacity,
            overflow: self.overflow,
        }
    }
}

impl<A: Clone + Send + 'static> ActionChannel<A> {
    /// Create a disconnected channel buffering up to `capacity` pending
    /// actions.
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                pending: VecDeque::new(),
                subscribers: Vec::new(),
                next_id: 0,
                open: false,
                connected: false,
                closed: false,
            })),
            capacity: capacity.max(1),
            overflow,
        }
    }

    /// Enqueue `action` for delivery.
    ///
    /// Never blocks. Before the channel is connected the action waits in
    /// the pending buffer; afterwards it is queued for every subscriber.
    /// Only the pending buffer can overflow, so a send either reaches every
    /// subscriber or none of them.
    pub fn send(&self, action: A) -> Result<(), HolderError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(HolderError::Stopped);
        }

        if !state.connected {
            return push_bounded(&mut state.pending, action, self.capacity, self.overflow);
        }

        for (_, subscriber) in &state.subscribers {
            subscriber.queue.lock().push_back(action.clone());
            subscriber.notify.notify_one();
        }
        Ok(())
    }

    /// Register a new consumer.
    ///
    /// The returned stream only receives actions once the channel is
    /// connected. Subscribing while the channel is open connects it at
    /// once and delivers anything pending. Dropping the stream unregisters
    /// the consumer; dropping the last one disconnects the channel.
    pub fn subscribe(&self) -> impl Stream<Item = A> + Send + Unpin + 'static {
        let subscriber = Arc::new(Subscriber::new());
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            if state.closed {
                subscriber.close();
            }
            state.subscribers.push((id, Arc::clone(&subscriber)));
            if state.open && !state.connected && !state.closed {
                state.flush();
            }
            id
        };

        let registration = Registration {
            id,
            channel: Arc::clone(&self.state),
        };

        Box::pin(stream::unfold(
            (subscriber, registration),
            |(subscriber, registration)| async move {
                loop {
                    let next = subscriber.queue.lock().pop_front();
                    if let Some(action) = next {
                        return Some((action, (subscriber, registration)));
                    }
                    if *subscriber.closed.lock() {
                        return None;
                    }
                    subscriber.notify.notified().await;
                }
            },
        ))
    }

    /// Mark the consuming pipeline as running.
    ///
    /// Connects and flushes pending actions if a subscriber is already
    /// registered; otherwise the first later subscriber does. Returns
    /// whether the channel is connected afterwards.
    pub fn open(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.open = true;
        if !state.connected && !state.subscribers.is_empty() {
            state.flush();
        }
        state.connected
    }

    /// Mark the pipeline as stopped. Later sends wait in the pending buffer
    /// until the channel is opened again.
    pub fn halt(&self) {
        let mut state = self.state.lock();
        state.open = false;
        state.connected = false;
    }

    /// Whether actions are currently delivered straight to subscribers.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Number of actions waiting for a subscriber.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of registered consumers.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Reject further sends and end every subscription.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.open = false;
        state.connected = false;
        state.pending.clear();
        for (_, subscriber) in &state.subscribers {
            subscriber.close();
        }
    }

    /// Whether the channel was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Consumer handle handed to a transform.
///
/// Each call to [`ActionSource::subscribe`] registers an independent
/// consumer; every consumer sees every action sent after the channel
/// connects, so a transform can split one action vocabulary into several
/// mutation sources.
pub struct ActionSource<A> {
    channel: ActionChannel<A>,
}

impl<A> Clone for ActionSource<A> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<A: Clone + Send + 'static> ActionSource<A> {
    pub(crate) fn new(channel: ActionChannel<A>) -> Self {
        Self { channel }
    }

    /// Register a consumer and return its stream of actions.
    pub fn subscribe(&self) -> impl Stream<Item = A> + Send + Unpin + 'static {
        self.channel.subscribe()
    }
}

fn push_bounded<A>(
    queue: &mut VecDeque<A>,
    action: A,
    capacity: usize,
    overflow: OverflowPolicy,
) -> Result<(), HolderError> {
    if queue.len() >= capacity {
        match overflow {
            OverflowPolicy::DropOldest => {
                queue.pop_front();
                tracing::warn!(capacity, "action buffer full, dropped oldest action");
            }
            OverflowPolicy::Reject => {
                return Err(HolderError::BufferFull { capacity });
            }
        }
    }
    queue.push_back(action);
    Ok(())
}

struct Registration<A> {
    id: u64,
    channel: Arc<Mutex<ChannelState<A>>>,
}

impl<A> Drop for Registration<A> {
    fn drop(&mut self) {
        let mut state = self.channel.lock();
        state.subscribers.retain(|(id, _)| *id != self.id);
        if state.subscribers.is_empty() {
            state.connected = false;
        }
    }
}
