//! bayeux-broker server entry point.
//!
//! Starts the Axum HTTP server hosting the long-polling protocol
//! endpoints and the background sweeper.

use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bayeux_broker::api;
use bayeux_broker::app_state::AppState;
use bayeux_broker::config::BrokerConfig;
use bayeux_broker::service::Broker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BrokerConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        base_path = %config.base_path,
        "starting bayeux-broker"
    );

    // Build broker and application state
    let app_state = AppState::from_config(config.clone());

    // Background tasks: idle-session sweeper and event logger
    let _sweeper = Broker::spawn_sweeper(Arc::clone(&app_state.broker));
    let mut events = app_state.broker.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(event_type = event.event_type_str(), "broker event");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Build router
    let app = api::build_router(&config.base_path)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
