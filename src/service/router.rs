//! Message router: publish fan-out to subscriber queues.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value as JsonValue;

use crate::domain::{
    BrokerEvent, ChannelRegistry, ClientId, EventBus, QueuedMessage, Session, SessionRegistry,
    channel_name,
};
use crate::error::BrokerError;

/// Delivers published payloads to every matching subscriber's queue.
///
/// Fan-out is synchronous enqueue work: the router resolves the
/// subscriber set once, appends the payload to each session's queue and
/// wakes their parked polls. Subscribers added after a publish do not
/// retroactively receive it.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    sessions: Arc<SessionRegistry>,
    channels: Arc<ChannelRegistry>,
    event_bus: EventBus,
    deliver_to_self: bool,
}

impl MessageRouter {
    /// Creates a router over the shared registries.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionRegistry>,
        channels: Arc<ChannelRegistry>,
        event_bus: EventBus,
        deliver_to_self: bool,
    ) -> Self {
        Self {
            sessions,
            channels,
            event_bus,
            deliver_to_self,
        }
    }

    /// Publishes `payload` to the concrete channel `channel`.
    ///
    /// The channel is registered on first use. Every session subscribed
    /// to the channel or to a covering wildcard pattern at publish time
    /// gets the payload appended to its queue exactly once, in publish
    /// order. When self-delivery is disabled, `sender` is excluded.
    ///
    /// Returns the number of sessions the payload was queued for.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ChannelInvalid`] if `channel` is not a
    /// valid concrete channel name.
    pub async fn publish(
        &self,
        channel: &str,
        payload: JsonValue,
        sender: Option<ClientId>,
    ) -> Result<usize, BrokerError> {
        channel_name::validate_publish_name(channel)?;

        if self.channels.ensure(channel).await {
            let _ = self.event_bus.publish(BrokerEvent::ChannelAdded {
                channel: channel.to_string(),
                timestamp: Utc::now(),
            });
            tracing::debug!(channel, "channel registered on first publish");
        }

        let mut recipients: Vec<Arc<Session>> = Vec::new();
        for client_id in self.channels.matching_subscribers(channel).await {
            if !self.deliver_to_self && sender == Some(client_id) {
                continue;
            }
            // A session swept between matching and lookup simply drops
            // out of the fan-out.
            if let Ok(session) = self.sessions.get(client_id).await {
                recipients.push(session);
            }
        }

        let overflows = join_all(recipients.iter().map(|session| {
            session.enqueue(QueuedMessage::new(channel.to_string(), payload.clone()))
        }))
        .await;

        for (session, dropped) in recipients.iter().zip(overflows) {
            if dropped.is_some() {
                tracing::warn!(
                    client_id = %session.client_id(),
                    channel,
                    "delivery queue full, dropped oldest payload"
                );
            }
        }

        let delivered = recipients.len();
        let _ = self.event_bus.publish(BrokerEvent::Published {
            channel: channel.to_string(),
            recipients: delivered,
            timestamp: Utc::now(),
        });
        tracing::debug!(channel, recipients = delivered, "publish fanned out");

        Ok(delivered)
    }
}
