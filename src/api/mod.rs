//! HTTP API layer: route handlers, DTOs, and router composition.
//!
//! Protocol endpoints are mounted under the configured base path
//! (`/notifications` by default); system endpoints live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete router: protocol routes nested under
/// `base_path` plus root-level system endpoints.
pub fn build_router(base_path: &str) -> Router<AppState> {
    let protocol = handlers::protocol_routes();
    let router = if base_path.is_empty() || base_path == "/" {
        protocol
    } else {
        Router::new().nest(base_path, protocol)
    };
    router.merge(handlers::system::routes())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    use crate::config::BrokerConfig;

    const SUBSCRIBE: &str = "/notifications";
    const HANDSHAKE: &str = "/notifications/handshake";
    const CONNECT: &str = "/notifications/connect";
    const DISCONNECT: &str = "/notifications/disconnect";

    const UNKNOWN_CLIENT_ID: &str = "11111111-2222-4333-8444-555555555555";

    fn make_app() -> (Router, AppState) {
        make_app_with(BrokerConfig::default())
    }

    fn make_app_with(config: BrokerConfig) -> (Router, AppState) {
        let state = AppState::from_config(config);
        let app = build_router(&state.config.base_path).with_state(state.clone());
        (app, state)
    }

    fn post_json(uri: &str, body: &JsonValue) -> Request<Body> {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()));
        let Ok(request) = request else {
            panic!("request must build");
        };
        request
    }

    async fn send(app: &Router, uri: &str, body: &JsonValue) -> axum::response::Response {
        let Ok(response) = app.clone().oneshot(post_json(uri, body)).await else {
            panic!("router is infallible");
        };
        response
    }

    async fn response_json(response: axum::response::Response) -> JsonValue {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), 1_000_000).await else {
            panic!("body must collect");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body must be json");
        };
        value
    }

    async fn handshake(app: &Router) -> String {
        let response = send(
            app,
            HANDSHAKE,
            &json!([{
                "id": "1",
                "version": "1.0",
                "minimumVersion": "1.0",
                "channel": "/meta/handshake",
                "supportedConnectionTypes": ["long-polling"],
            }]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body.pointer("/0/successful"), Some(&json!(true)));
        let Some(client_id) = body.pointer("/0/clientId").and_then(JsonValue::as_str) else {
            panic!("handshake response lacks clientId");
        };
        client_id.to_string()
    }

    async fn subscribe(app: &Router, client_id: &str, subscription: &JsonValue) {
        let response = send(
            app,
            SUBSCRIBE,
            &json!([{
                "id": "2",
                "channel": "/meta/subscribe",
                "clientId": client_id,
                "subscription": subscription,
            }]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body.pointer("/0/successful"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn health_and_status_endpoints() {
        let (app, _) = make_app();

        let request = Request::builder().uri("/health").body(Body::empty());
        let Ok(request) = request else {
            panic!("request must build");
        };
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body.get("status"), Some(&json!("healthy")));

        let request = Request::builder().uri("/status").body(Body::empty());
        let Ok(request) = request else {
            panic!("request must build");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        let body = response_json(response).await;
        assert_eq!(body.get("sessions"), Some(&json!(0)));
        assert_eq!(body.get("channels"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn handshake_grants_version_and_advice() {
        let (app, _) = make_app();

        let response = send(
            &app,
            HANDSHAKE,
            &json!([{
                "id": "1",
                "version": "1.0",
                "minimumVersion": "1.0",
                "channel": "/meta/handshake",
                "supportedConnectionTypes": ["long-polling"],
            }]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body.pointer("/0/id"), Some(&json!("1")));
        assert_eq!(body.pointer("/0/channel"), Some(&json!("/meta/handshake")));
        assert_eq!(body.pointer("/0/successful"), Some(&json!(true)));
        assert_eq!(body.pointer("/0/version"), Some(&json!("1.0")));
        assert_eq!(
            body.pointer("/0/supportedConnectionTypes"),
            Some(&json!(["long-polling"]))
        );
        assert_eq!(
            body.pointer("/0/advice"),
            Some(&json!({"reconnect": "retry", "timeout": 20_000, "interval": 0}))
        );
        assert!(body.pointer("/0/clientId").is_some());
    }

    #[tokio::test]
    async fn handshake_rejects_wrong_version() {
        let (app, _) = make_app();

        let body = response_json(
            send(
                &app,
                HANDSHAKE,
                &json!([{
                    "id": "1",
                    "channel": "/meta/handshake",
                    "minimumVersion": "2.0",
                    "supportedConnectionTypes": ["long-polling"],
                }]),
            )
            .await,
        )
        .await;

        assert_eq!(
            body,
            json!([{
                "id": "1",
                "channel": "/meta/handshake",
                "successful": false,
                "minimumVersion": "2.0",
                "error": "400::minimum_version_missing",
            }])
        );
    }

    #[tokio::test]
    async fn handshake_requires_long_polling() {
        let (app, _) = make_app();

        let body = response_json(
            send(
                &app,
                HANDSHAKE,
                &json!([{
                    "id": "1",
                    "channel": "/meta/handshake",
                    "minimumVersion": "1.0",
                    "supportedConnectionTypes": ["websocket"],
                }]),
            )
            .await,
        )
        .await;

        assert_eq!(
            body,
            json!([{
                "id": "1",
                "channel": "/meta/handshake",
                "successful": false,
                "error": "404::connection_type_unsupported",
            }])
        );
    }

    #[tokio::test]
    async fn handshake_batch_without_meta_message() {
        let (app, _) = make_app();

        let body = response_json(
            send(
                &app,
                HANDSHAKE,
                &json!([{"id": "9", "channel": "/meta/non_handshake"}]),
            )
            .await,
        )
        .await;

        assert_eq!(
            body,
            json!([{
                "id": "9",
                "channel": "/meta/non_handshake",
                "successful": false,
                "error": "400::channel_missing",
            }])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn publish_then_connect_delivers() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;
        subscribe(&app, &client_id, &json!("/topic0")).await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "3",
                    "channel": "/topic0",
                    "clientId": client_id,
                    "data": {"msg": "Hello from /topic0"},
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{"id": "3", "channel": "/topic0", "successful": true}])
        );

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "4",
                    "channel": "/meta/connect",
                    "connectionType": "long-polling",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([
                {"channel": "/topic0", "data": {"msg": "Hello from /topic0"}},
                {"id": "4", "channel": "/meta/connect", "successful": true},
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_with_nothing_queued_times_out_empty() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "5",
                    "channel": "/meta/connect",
                    "connectionType": "long-polling",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;

        assert_eq!(
            body,
            json!([{
                "id": "5",
                "channel": "/meta/connect",
                "successful": true,
                "advice": {"reconnect": "retry", "timeout": 20_000, "interval": 0},
            }])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_connects_use_configured_status() {
        let (app, _) = make_app_with(BrokerConfig {
            duplicate_connect_status: 418,
            ..BrokerConfig::default()
        });
        let client_id = handshake(&app).await;

        let parked = tokio::spawn({
            let app = app.clone();
            let body = json!([{
                "id": "6",
                "channel": "/meta/connect",
                "clientId": client_id,
            }]);
            async move { app.oneshot(post_json(CONNECT, &body)).await }
        });
        tokio::task::yield_now().await;

        let response = send(
            &app,
            CONNECT,
            &json!([{
                "id": "7",
                "channel": "/meta/connect",
                "clientId": client_id,
            }]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        let body = response_json(response).await;
        assert_eq!(
            body,
            json!([{
                "id": "7",
                "channel": "/meta/connect",
                "successful": false,
                "error": "409::duplicate_connect",
            }])
        );

        parked.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_unblocks_pending_poll() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let parked = tokio::spawn({
            let app = app.clone();
            let body = json!([{
                "id": "8",
                "channel": "/meta/connect",
                "clientId": client_id,
            }]);
            async move { app.oneshot(post_json(CONNECT, &body)).await }
        });
        tokio::task::yield_now().await;

        let body = response_json(
            send(
                &app,
                DISCONNECT,
                &json!([{
                    "id": "9",
                    "channel": "/meta/disconnect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{"id": "9", "channel": "/meta/disconnect", "successful": true}])
        );

        let Ok(Ok(response)) = parked.await else {
            panic!("parked poll must resolve");
        };
        let body = response_json(response).await;
        assert_eq!(
            body,
            json!([{
                "id": "8",
                "channel": "/meta/connect",
                "successful": false,
                "error": "402::session_unknown",
                "advice": {"reconnect": "handshake", "interval": 0},
            }])
        );
    }

    #[tokio::test]
    async fn publish_batch_with_meta_channel_is_rejected() {
        let (app, _) = make_app();

        let response = send(
            &app,
            CONNECT,
            &json!([
                {"channel": "/meta/random"},
                {"channel": "/topic0"},
            ]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn publish_acks_follow_original_precedence() {
        let (app, _) = make_app();

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{"id": "10", "clientId": UNKNOWN_CLIENT_ID}]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{"id": "10", "successful": false, "error": "400::channel_missing"}])
        );

        let body = response_json(
            send(&app, CONNECT, &json!([{"id": "11", "channel": "/topic"}])).await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "11",
                "channel": "/topic",
                "successful": false,
                "error": "402::session_unknown",
                "advice": {"reconnect": "handshake", "interval": 0},
            }])
        );

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "12",
                    "channel": "/topic",
                    "clientId": UNKNOWN_CLIENT_ID,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "12",
                "channel": "/topic",
                "successful": false,
                "error": "402::session_unknown",
            }])
        );
    }

    #[tokio::test]
    async fn publish_to_invalid_channel_fails_in_envelope() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "13",
                    "channel": "/topic*",
                    "clientId": client_id,
                    "data": {},
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "13",
                "channel": "/topic*",
                "successful": false,
                "error": "405::channel_invalid",
            }])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn single_segment_wildcard_reach() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;
        subscribe(&app, &client_id, &json!(["/*"])).await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([
                    {"id": "14", "channel": "/topic0", "clientId": client_id, "data": {"n": 0}},
                    {"id": "15", "channel": "/topic1", "clientId": client_id, "data": {"n": 1}},
                    {"id": "16", "channel": "/a/b", "clientId": client_id, "data": {"n": 2}},
                ]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([
                {"id": "14", "channel": "/topic0", "successful": true},
                {"id": "15", "channel": "/topic1", "successful": true},
                {"id": "16", "channel": "/a/b", "successful": true},
            ])
        );

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "17",
                    "channel": "/meta/connect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([
                {"channel": "/topic0", "data": {"n": 0}},
                {"channel": "/topic1", "data": {"n": 1}},
                {"id": "17", "channel": "/meta/connect", "successful": true},
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deep_wildcard_reach() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;
        subscribe(&app, &client_id, &json!(["/**"])).await;

        let _ = send(
            &app,
            CONNECT,
            &json!([
                {"id": "18", "channel": "/a/b", "clientId": client_id, "data": {"n": 0}},
                {"id": "19", "channel": "/a", "clientId": client_id, "data": {"n": 1}},
            ]),
        )
        .await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "20",
                    "channel": "/meta/connect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([
                {"channel": "/a/b", "data": {"n": 0}},
                {"channel": "/a", "data": {"n": 1}},
                {"id": "20", "channel": "/meta/connect", "successful": true},
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_delivery() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;
        subscribe(&app, &client_id, &json!(["/topic0"])).await;

        let body = response_json(
            send(
                &app,
                SUBSCRIBE,
                &json!([{
                    "id": "21",
                    "channel": "/meta/unsubscribe",
                    "clientId": client_id,
                    "subscription": "/topic0",
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "21",
                "channel": "/meta/unsubscribe",
                "successful": true,
                "subscription": ["/topic0"],
            }])
        );

        let _ = send(
            &app,
            CONNECT,
            &json!([{"channel": "/topic0", "clientId": client_id, "data": {}}]),
        )
        .await;

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "22",
                    "channel": "/meta/connect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        // Timeout ack only, no deliveries.
        assert_eq!(body.pointer("/0/successful"), Some(&json!(true)));
        assert_eq!(
            body.pointer("/0/advice/reconnect"),
            Some(&json!("retry"))
        );
    }

    #[tokio::test]
    async fn subscribe_requires_subscription_field() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let body = response_json(
            send(
                &app,
                SUBSCRIBE,
                &json!([{
                    "id": "23",
                    "channel": "/meta/subscribe",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "23",
                "channel": "/meta/subscribe",
                "successful": false,
                "error": "403::subscription_missing",
            }])
        );

        let body = response_json(
            send(
                &app,
                SUBSCRIBE,
                &json!([{
                    "id": "24",
                    "channel": "/meta/subscribe",
                    "clientId": client_id,
                    "subscription": [],
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(body.pointer("/0/error"), Some(&json!("403::subscription_missing")));
    }

    #[tokio::test]
    async fn subscribe_rejects_invalid_pattern() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let body = response_json(
            send(
                &app,
                SUBSCRIBE,
                &json!([{
                    "id": "25",
                    "channel": "/meta/subscribe",
                    "clientId": client_id,
                    "subscription": ["/ok", "/bad*"],
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "25",
                "channel": "/meta/subscribe",
                "successful": false,
                "error": "405::channel_invalid",
            }])
        );
    }

    #[tokio::test]
    async fn root_endpoint_rejects_other_channels() {
        let (app, _) = make_app();

        let body = response_json(
            send(
                &app,
                SUBSCRIBE,
                &json!([{"id": "26", "channel": "/meta/handshake"}]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "26",
                "channel": "/meta/handshake",
                "successful": false,
                "error": "400::channel_missing",
            }])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn swept_session_is_unknown_to_connect() {
        let (app, state) = make_app();
        let client_id = handshake(&app).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let evicted = state.broker.sweep_now(tokio::time::Instant::now()).await;
        assert_eq!(evicted, 1);

        let body = response_json(
            send(
                &app,
                CONNECT,
                &json!([{
                    "id": "27",
                    "channel": "/meta/connect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "27",
                "channel": "/meta/connect",
                "successful": false,
                "error": "402::session_unknown",
                "advice": {"reconnect": "handshake", "interval": 0},
            }])
        );
    }

    #[tokio::test]
    async fn disconnect_is_terminal() {
        let (app, _) = make_app();
        let client_id = handshake(&app).await;

        let body = response_json(
            send(
                &app,
                DISCONNECT,
                &json!([{
                    "id": "28",
                    "channel": "/meta/disconnect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{"id": "28", "channel": "/meta/disconnect", "successful": true}])
        );

        let body = response_json(
            send(
                &app,
                DISCONNECT,
                &json!([{
                    "id": "29",
                    "channel": "/meta/disconnect",
                    "clientId": client_id,
                }]),
            )
            .await,
        )
        .await;
        assert_eq!(
            body,
            json!([{
                "id": "29",
                "channel": "/meta/disconnect",
                "successful": false,
                "error": "402::session_unknown",
            }])
        );
    }
}
