//! Protocol envelope DTOs shared by all meta and publish endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::domain::{ClientId, QueuedMessage};
use crate::error::BrokerError;

/// Reconnect directive carried in [`Advice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Reconnect {
    /// Issue the next `/meta/connect` after `interval` milliseconds.
    Retry,
    /// The session is gone; the client must handshake again.
    Handshake,
    /// Stop polling entirely.
    None,
}

/// Timing hints attached to meta responses (and accepted on connect
/// requests, where `timeout` asks for a shorter hold).
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct Advice {
    /// What the client should do after this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<Reconnect>,
    /// Long-poll hold budget in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Delay before the client's next request in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl Advice {
    /// Advice telling the client to keep polling with the given timing.
    #[must_use]
    pub const fn retry(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            reconnect: Some(Reconnect::Retry),
            timeout: Some(timeout_ms),
            interval: Some(interval_ms),
        }
    }

    /// Advice telling the client its session is gone and a fresh
    /// handshake is required.
    #[must_use]
    pub const fn handshake() -> Self {
        Self {
            reconnect: Some(Reconnect::Handshake),
            timeout: None,
            interval: Some(0),
        }
    }
}

/// One message in a protocol batch.
///
/// Request bodies are JSON arrays of these, and so are responses.
/// Absent fields are omitted on the wire; clients distinguish a missing
/// field from an explicit `null`, so every field skips serialization
/// when `None`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetaMessage {
    /// Client-supplied correlation token, echoed verbatim in the
    /// matching response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel this message addresses. `/meta/*` for control traffic,
    /// anything else is a publish or a delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Session identifier. Absent only during handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub client_id: Option<ClientId>,
    /// Whether the operation succeeded. Responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    /// Protocol version offered by the client or granted by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Oldest protocol version the client can fall back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
    /// Transports the client can use. Handshake only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,
    /// Transport the client chose for this connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Channel names or patterns being subscribed or unsubscribed.
    /// Accepts a bare string or an array on input.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_subscription"
    )]
    pub subscription: Option<Vec<String>>,
    /// Timing hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,
    /// Payload for publishes and deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<JsonValue>,
    /// Wire error string in `NNN::reason` form. Failed responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetaMessage {
    /// Successful ack echoing the request's correlation id and channel.
    #[must_use]
    pub fn ok(id: Option<String>, channel: Option<String>) -> Self {
        Self {
            id,
            channel,
            successful: Some(true),
            ..Self::default()
        }
    }

    /// Failed ack carrying the wire string for `error`.
    #[must_use]
    pub fn failed(id: Option<String>, channel: Option<String>, error: &BrokerError) -> Self {
        Self {
            id,
            channel,
            successful: Some(false),
            error: Some(error.wire_error().to_string()),
            ..Self::default()
        }
    }

    /// Failed ack with advice attached, used where the client should
    /// change its behavior (re-handshake after a lost session).
    #[must_use]
    pub fn failed_with_advice(
        id: Option<String>,
        channel: Option<String>,
        error: &BrokerError,
        advice: Advice,
    ) -> Self {
        Self {
            advice: Some(advice),
            ..Self::failed(id, channel, error)
        }
    }

    /// Data message delivered inside a connect response.
    #[must_use]
    pub fn delivery(message: QueuedMessage) -> Self {
        Self {
            channel: Some(message.channel),
            data: Some(message.data),
            ..Self::default()
        }
    }

    /// Whether this message addresses a `/meta/*` channel.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.channel
            .as_deref()
            .is_some_and(crate::domain::channel_name::is_meta_channel)
    }
}

fn deserialize_subscription<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    }))
}
