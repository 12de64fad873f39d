//! Disconnect endpoint handler.

use axum::Json;
use axum::extract::State;

use crate::api::dto::MetaMessage;
use crate::app_state::AppState;
use crate::error::BrokerError;

/// `POST <base>/disconnect` — Tear the session down.
///
/// The body is an array of exactly one `/meta/disconnect` message.
/// Removal releases every subscription, unblocks a pending poll for
/// the session, and fires the session-closed notification. Failures
/// are reported inside the envelope with HTTP 200.
#[utoipa::path(
    post,
    path = "/notifications/disconnect",
    tag = "Protocol",
    summary = "Tear down a session",
    description = "Removes the session and releases its subscriptions. The body is an array containing one /meta/disconnect message.",
    request_body = Vec<MetaMessage>,
    responses(
        (status = 200, description = "Disconnect result envelope", body = Vec<MetaMessage>),
    )
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Json(body): Json<[MetaMessage; 1]>,
) -> Json<[MetaMessage; 1]> {
    let [message] = body;
    let MetaMessage {
        id,
        channel,
        client_id,
        ..
    } = message;

    if channel.as_deref() != Some("/meta/disconnect") {
        return Json([MetaMessage::failed(
            id,
            channel,
            &BrokerError::ChannelMissing,
        )]);
    }

    let Some(client_id) = client_id else {
        return Json([MetaMessage::failed(
            id,
            channel,
            &BrokerError::SessionUnknown,
        )]);
    };

    Json([match state.broker.disconnect(client_id).await {
        Ok(()) => MetaMessage::ok(id, channel),
        Err(err) => MetaMessage::failed(id, channel, &err),
    }])
}
