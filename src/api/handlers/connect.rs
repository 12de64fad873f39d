//! Connect endpoint handler: long polls and publish batches.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::dto::{Advice, MetaMessage};
use crate::app_state::AppState;
use crate::error::BrokerError;
use crate::polling::PollOutcome;

/// `POST <base>/connect` — Long poll or publish.
///
/// A body holding exactly one `/meta/connect` message parks a long
/// poll for the session; any other batch is treated as a publish and
/// acknowledged per message. A publish batch may not carry `/meta/*`
/// messages. An overlapping connect for the same session is rejected
/// with the configured duplicate-connect status (409 by default); all
/// other failures are reported inside the envelope with HTTP 200.
#[utoipa::path(
    post,
    path = "/notifications/connect",
    tag = "Protocol",
    summary = "Long poll or publish",
    description = "Holds the request open until data is queued for the session or the hold budget elapses, or routes a batch of data messages to their channels.",
    request_body = Vec<MetaMessage>,
    responses(
        (status = 200, description = "Connect or publish result envelope", body = Vec<MetaMessage>),
        (status = 400, description = "Publish batch carried a /meta/* message"),
        (status = 409, description = "A connect for this session is already pending", body = Vec<MetaMessage>),
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(messages): Json<Vec<MetaMessage>>,
) -> Response {
    match <[MetaMessage; 1]>::try_from(messages) {
        Ok([message]) if message.channel.as_deref() == Some("/meta/connect") => {
            meta_connect(&state, message).await
        }
        Ok([message]) => publish_batch(&state, vec![message]).await,
        Err(messages) => publish_batch(&state, messages).await,
    }
}

/// Parks the long poll and shapes its outcome into a response body of
/// zero or more data messages followed by the connect ack.
async fn meta_connect(state: &AppState, message: MetaMessage) -> Response {
    let MetaMessage {
        id,
        channel,
        client_id,
        advice,
        ..
    } = message;

    let Some(client_id) = client_id else {
        return ok_json(vec![MetaMessage::failed_with_advice(
            id,
            channel,
            &BrokerError::SessionUnknown,
            Advice::handshake(),
        )]);
    };

    let requested = advice.and_then(|a| a.timeout).map(Duration::from_millis);

    match state.broker.connect(client_id, requested).await {
        Ok(PollOutcome::Delivered(deliveries)) => {
            let mut body: Vec<MetaMessage> =
                deliveries.into_iter().map(MetaMessage::delivery).collect();
            body.push(MetaMessage::ok(id, channel));
            ok_json(body)
        }
        Ok(PollOutcome::Timeout) => ok_json(vec![MetaMessage {
            advice: Some(Advice::retry(
                state.config.timeout_ms(),
                state.config.interval_ms(),
            )),
            ..MetaMessage::ok(id, channel)
        }]),
        Ok(PollOutcome::SessionEnded) => ok_json(vec![MetaMessage::failed_with_advice(
            id,
            channel,
            &BrokerError::SessionUnknown,
            Advice::handshake(),
        )]),
        Err(err @ BrokerError::DuplicateConnect(_)) => {
            let status = StatusCode::from_u16(state.config.duplicate_connect_status)
                .unwrap_or(StatusCode::CONFLICT);
            (status, Json(vec![MetaMessage::failed(id, channel, &err)])).into_response()
        }
        Err(err) => ok_json(vec![MetaMessage::failed_with_advice(
            id,
            channel,
            &err,
            Advice::handshake(),
        )]),
    }
}

/// Routes every message of a publish batch and acknowledges each one
/// in place.
async fn publish_batch(state: &AppState, mut messages: Vec<MetaMessage>) -> Response {
    if messages.iter().any(MetaMessage::is_meta) {
        return BrokerError::MetaInPublishBatch.status_code().into_response();
    }

    for message in &mut messages {
        let MetaMessage {
            id,
            channel,
            client_id,
            data,
            ..
        } = std::mem::take(message);

        *message = match (channel, client_id) {
            (None, _) => MetaMessage::failed(id, None, &BrokerError::ChannelMissing),
            (channel, None) => MetaMessage::failed_with_advice(
                id,
                channel,
                &BrokerError::SessionUnknown,
                Advice::handshake(),
            ),
            (Some(channel), Some(client_id)) => {
                if state.broker.touch_session(client_id).await.is_err() {
                    MetaMessage::failed(id, Some(channel), &BrokerError::SessionUnknown)
                } else {
                    let payload = data.unwrap_or_default();
                    match state.broker.publish(&channel, payload, Some(client_id)).await {
                        Ok(_) => MetaMessage::ok(id, Some(channel)),
                        Err(err) => MetaMessage::failed(id, Some(channel), &err),
                    }
                }
            }
        };
    }

    ok_json(messages)
}

fn ok_json(body: Vec<MetaMessage>) -> Response {
    Json(body).into_response()
}
