//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::service::Broker;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broker owning all session and channel state.
    pub broker: Arc<Broker>,
    /// Configuration snapshot for advice timing and status mapping.
    pub config: Arc<BrokerConfig>,
}

impl AppState {
    /// Builds the state from a configuration, constructing the broker.
    #[must_use]
    pub fn from_config(config: BrokerConfig) -> Self {
        let broker = Arc::new(Broker::new(&config));
        Self {
            broker,
            config: Arc::new(config),
        }
    }
}
