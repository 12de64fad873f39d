//! Domain events reflecting broker state changes.
//!
//! Every session, channel and publish mutation emits a [`BrokerEvent`]
//! through the [`super::EventBus`]. Observers subscribe to the bus for
//! logging or monitoring; delivery to clients does not depend on it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ClientId;

/// Why a session was closed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCloseReason {
    /// The client sent `/meta/disconnect`.
    Disconnect,
    /// The idle sweeper evicted the session.
    IdleTimeout,
}

/// Domain event emitted after every broker state change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BrokerEvent {
    /// Emitted when a handshake creates a session.
    SessionOpened {
        /// Identifier of the new session.
        client_id: ClientId,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a session ends.
    SessionClosed {
        /// Identifier of the closed session.
        client_id: ClientId,
        /// Whether the client left or was evicted.
        reason: SessionCloseReason,
        /// Closure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted the first time a channel name is registered, whether by
    /// subscribe or by publish.
    ChannelAdded {
        /// The newly registered channel name or pattern.
        channel: String,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a client subscribes to a channel.
    Subscribed {
        /// Subscribing session.
        client_id: ClientId,
        /// Channel name or wildcard pattern subscribed to.
        channel: String,
        /// Subscription timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a client drops a subscription.
    Unsubscribed {
        /// Unsubscribing session.
        client_id: ClientId,
        /// Channel name or wildcard pattern dropped.
        channel: String,
        /// Unsubscription timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a publish has been fanned out.
    Published {
        /// Concrete channel the payload was published to.
        channel: String,
        /// Number of sessions the payload was queued for.
        recipients: usize,
        /// Publish timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl BrokerEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SessionOpened { .. } => "session_opened",
            Self::SessionClosed { .. } => "session_closed",
            Self::ChannelAdded { .. } => "channel_added",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
            Self::Published { .. } => "published",
        }
    }
}
