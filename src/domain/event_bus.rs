//! Broadcast channel for broker events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The broker
//! publishes a [`BrokerEvent`] after each state change; observers such
//! as the event logger subscribe for a live feed.

use tokio::sync::broadcast;

use super::BrokerEvent;

/// Broadcast bus for [`BrokerEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest events are dropped for
/// lagging receivers; client message delivery never flows through the
/// bus, so a lagging observer cannot stall the broker.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BrokerEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event. With no
    /// active receivers the event is silently dropped.
    pub fn publish(&self, event: BrokerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will observe all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
