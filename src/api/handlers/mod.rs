//! Protocol endpoint handlers organized by meta channel.

pub mod connect;
pub mod disconnect;
pub mod handshake;
pub mod subscribe;
pub mod system;

use axum::Router;
use axum::routing::post;

use crate::app_state::AppState;

/// Composes the four protocol routes mounted under the base path.
pub fn protocol_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(subscribe::subscribe))
        .route("/handshake", post(handshake::handshake))
        .route("/connect", post(connect::connect))
        .route("/disconnect", post(disconnect::disconnect))
}
