//! Domain layer: core types, registries, and event system.
//!
//! This module contains the server-side domain model including client
//! identity, per-session delivery queues, the channel subscriber map
//! with wildcard matching, and the event bus for broadcasting state
//! changes.

pub mod broker_event;
pub mod channel_name;
pub mod channel_registry;
pub mod client_id;
pub mod event_bus;
pub mod message;
pub mod session;
pub mod session_registry;

pub use broker_event::{BrokerEvent, SessionCloseReason};
pub use channel_registry::{ChannelRegistry, ChannelRetention};
pub use client_id::ClientId;
pub use event_bus::EventBus;
pub use message::QueuedMessage;
pub use session::Session;
pub use session_registry::SessionRegistry;
