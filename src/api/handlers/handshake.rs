//! Handshake endpoint handler.

use axum::Json;
use axum::extract::State;

use crate::api::dto::{Advice, MetaMessage};
use crate::app_state::AppState;
use crate::error::BrokerError;
use crate::service::broker::{CONNECTION_TYPE_LONG_POLLING, PROTOCOL_VERSION};

/// `POST <base>/handshake` — Open a session.
///
/// The body is an array that must contain one `/meta/handshake`
/// message. On success the response carries the minted `clientId`,
/// the granted protocol version, and retry advice; failures are
/// reported inside the envelope with HTTP 200.
#[utoipa::path(
    post,
    path = "/notifications/handshake",
    tag = "Protocol",
    summary = "Open a session",
    description = "Negotiates protocol version and transport and mints a clientId. The body is an array containing one /meta/handshake message.",
    request_body = Vec<MetaMessage>,
    responses(
        (status = 200, description = "Handshake result envelope", body = Vec<MetaMessage>),
    )
)]
pub async fn handshake(
    State(state): State<AppState>,
    Json(mut messages): Json<Vec<MetaMessage>>,
) -> Json<Vec<MetaMessage>> {
    let Some(position) = messages
        .iter()
        .position(|m| m.channel.as_deref() == Some("/meta/handshake"))
    else {
        let (id, channel) = messages
            .into_iter()
            .next()
            .map_or((None, None), |m| (m.id, m.channel));
        return Json(vec![MetaMessage::failed(
            id,
            channel,
            &BrokerError::ChannelMissing,
        )]);
    };
    let MetaMessage {
        id,
        channel,
        minimum_version,
        supported_connection_types,
        ..
    } = messages.swap_remove(position);

    let outcome = state
        .broker
        .handshake(
            minimum_version.as_deref(),
            supported_connection_types.as_deref(),
        )
        .await;

    let response = match outcome {
        Ok(session) => MetaMessage {
            client_id: Some(session.client_id()),
            version: Some(PROTOCOL_VERSION.to_string()),
            supported_connection_types: Some(vec![CONNECTION_TYPE_LONG_POLLING.to_string()]),
            advice: Some(Advice::retry(
                state.config.timeout_ms(),
                state.config.interval_ms(),
            )),
            ..MetaMessage::ok(id, channel)
        },
        Err(err) => {
            let mut nack = MetaMessage::failed(id, channel, &err);
            if let BrokerError::VersionMismatch(requested) = err {
                nack.minimum_version = requested;
            }
            nack
        }
    };

    Json(vec![response])
}
