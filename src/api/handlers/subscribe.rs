//! Subscribe and unsubscribe endpoint handler.

use axum::Json;
use axum::extract::State;

use crate::api::dto::MetaMessage;
use crate::app_state::AppState;
use crate::error::BrokerError;

/// `POST <base>/` — Attach to or detach from channels.
///
/// The body is an array of exactly one `/meta/subscribe` or
/// `/meta/unsubscribe` message. The `subscription` field accepts a
/// single name or an array of names, each of which may be a concrete
/// channel or a `/*` / `/**` pattern. Failures are reported inside
/// the envelope with HTTP 200.
#[utoipa::path(
    post,
    path = "/notifications/",
    tag = "Protocol",
    summary = "Subscribe or unsubscribe channels",
    description = "Attaches or detaches the session for every named channel or pattern. The body is an array containing one /meta/subscribe or /meta/unsubscribe message.",
    request_body = Vec<MetaMessage>,
    responses(
        (status = 200, description = "Subscription result envelope", body = Vec<MetaMessage>),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<[MetaMessage; 1]>,
) -> Json<[MetaMessage; 1]> {
    let [message] = body;
    let MetaMessage {
        id,
        channel,
        client_id,
        subscription,
        ..
    } = message;

    let unsubscribing = match channel.as_deref() {
        Some("/meta/subscribe") => false,
        Some("/meta/unsubscribe") => true,
        _ => {
            return Json([MetaMessage::failed(
                id,
                channel,
                &BrokerError::ChannelMissing,
            )]);
        }
    };

    let Some(client_id) = client_id else {
        return Json([MetaMessage::failed(
            id,
            channel,
            &BrokerError::SessionUnknown,
        )]);
    };
    if state.broker.touch_session(client_id).await.is_err() {
        return Json([MetaMessage::failed(
            id,
            channel,
            &BrokerError::SessionUnknown,
        )]);
    }

    let names = subscription.unwrap_or_default();
    if names.is_empty() {
        return Json([MetaMessage::failed(
            id,
            channel,
            &BrokerError::SubscriptionMissing,
        )]);
    }

    let result = if unsubscribing {
        state.broker.unsubscribe(client_id, &names).await
    } else {
        state.broker.subscribe(client_id, &names).await
    };

    Json([match result {
        Ok(()) => MetaMessage {
            subscription: Some(names),
            ..MetaMessage::ok(id, channel)
        },
        Err(err) => MetaMessage::failed(id, channel, &err),
    }])
}
