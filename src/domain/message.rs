//! Published payloads queued for long-poll delivery.

use serde::Serialize;

/// A published payload parked in a session's delivery queue.
///
/// Serialized on the wire as `{"channel": ..., "data": ...}` alongside
/// the `/meta/connect` acknowledgement that drains it.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedMessage {
    /// Concrete channel the payload was published to.
    pub channel: String,
    /// Arbitrary JSON payload supplied by the publisher.
    pub data: serde_json::Value,
}

impl QueuedMessage {
    /// Creates a message bound for delivery on `channel`.
    #[must_use]
    pub fn new(channel: String, data: serde_json::Value) -> Self {
        Self { channel, data }
    }
}
