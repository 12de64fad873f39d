//! Per-client session state for long-polling clients.
//!
//! A [`Session`] owns the client's delivery queue and the two
//! synchronization primitives the long-poll transport relies on: a
//! [`Notify`] that wakes a parked `/meta/connect`, and a connect gate
//! that rejects a second concurrent `/meta/connect` for the same
//! client.

use std::collections::{HashSet, VecDeque};

use tokio::sync::{Mutex, MutexGuard, Notify, RwLock};
use tokio::time::Instant;

use super::{ClientId, QueuedMessage};

/// Mutable session state guarded by the session's inner lock.
#[derive(Debug)]
struct SessionState {
    /// FIFO queue of payloads awaiting the next `/meta/connect` drain.
    queue: VecDeque<QueuedMessage>,
    /// Channel names and patterns this session is subscribed to.
    subscriptions: HashSet<String>,
    /// Last protocol activity, used by the idle sweeper.
    last_seen: Instant,
    /// Set once the session is evicted or disconnected.
    closed: bool,
}

/// A handshaken client and its delivery queue.
///
/// Sessions are shared as `Arc<Session>`: the registry, the router and
/// a parked long poll may all hold one concurrently. Mutable state
/// lives behind an inner `RwLock`; the wakeup and connect gate sit
/// outside it so they can be used without holding the lock.
///
/// # Concurrency
///
/// - [`Session::enqueue`] stores a wakeup permit, so a payload queued
///   between a poll's empty-queue check and its park is never missed.
/// - [`Session::try_begin_connect`] admits at most one in-flight
///   `/meta/connect` per session; the guard is held for the whole poll.
#[derive(Debug)]
pub struct Session {
    client_id: ClientId,
    state: RwLock<SessionState>,
    wakeup: Notify,
    connect_gate: Mutex<()>,
    queue_capacity: usize,
}

impl Session {
    /// Creates a fresh session with an empty queue.
    ///
    /// `queue_capacity` bounds the delivery queue; once full, the
    /// oldest payload is dropped to admit a new one.
    #[must_use]
    pub fn new(client_id: ClientId, queue_capacity: usize) -> Self {
        Self {
            client_id,
            state: RwLock::new(SessionState {
                queue: VecDeque::new(),
                subscriptions: HashSet::new(),
                last_seen: Instant::now(),
                closed: false,
            }),
            wakeup: Notify::new(),
            connect_gate: Mutex::new(()),
            queue_capacity,
        }
    }

    /// Returns the client identifier this session belongs to.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the wakeup primitive the transport parks on.
    #[must_use]
    pub fn wakeup(&self) -> &Notify {
        &self.wakeup
    }

    /// Claims the session's connect slot.
    ///
    /// Returns `None` if another `/meta/connect` already holds it. The
    /// returned guard must be kept alive for the duration of the poll.
    #[must_use]
    pub fn try_begin_connect(&self) -> Option<MutexGuard<'_, ()>> {
        self.connect_gate.try_lock().ok()
    }

    /// Appends a payload to the delivery queue and wakes any parked poll.
    ///
    /// Returns the payload dropped from the front of the queue if the
    /// capacity bound was hit, so the caller can log the overflow.
    pub async fn enqueue(&self, message: QueuedMessage) -> Option<QueuedMessage> {
        let dropped = {
            let mut state = self.state.write().await;
            let dropped = if state.queue.len() >= self.queue_capacity {
                state.queue.pop_front()
            } else {
                None
            };
            state.queue.push_back(message);
            dropped
        };
        // notify_one stores a permit when nobody is parked yet, so the
        // wakeup survives the gap before the poll calls notified().
        self.wakeup.notify_one();
        dropped
    }

    /// Removes and returns every queued payload in FIFO order.
    pub async fn drain(&self) -> Vec<QueuedMessage> {
        let mut state = self.state.write().await;
        state.queue.drain(..).collect()
    }

    /// Returns the current queue depth.
    pub async fn queued(&self) -> usize {
        self.state.read().await.queue.len()
    }

    /// Records protocol activity at `now` for idle tracking.
    pub async fn touch(&self, now: Instant) {
        self.state.write().await.last_seen = now;
    }

    /// Returns the instant of the last recorded activity.
    pub async fn last_seen(&self) -> Instant {
        self.state.read().await.last_seen
    }

    /// Marks the session closed and wakes any parked poll so it can
    /// observe the closure.
    pub async fn mark_closed(&self) {
        self.state.write().await.closed = true;
        self.wakeup.notify_one();
    }

    /// Returns `true` once the session has been closed.
    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }

    /// Adds a subscription, returning `false` if it was already present.
    pub async fn add_subscription(&self, channel: &str) -> bool {
        self.state
            .write()
            .await
            .subscriptions
            .insert(channel.to_string())
    }

    /// Drops a subscription, returning `false` if it was not present.
    pub async fn remove_subscription(&self, channel: &str) -> bool {
        self.state.write().await.subscriptions.remove(channel)
    }

    /// Returns a snapshot of the session's subscriptions.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .subscriptions
            .iter()
            .cloned()
            .collect()
    }
}
