//! # bayeux-broker
//!
//! CometD-style publish/subscribe messaging broker over long-polling
//! HTTP.
//!
//! Clients handshake to obtain a session, subscribe to channels (with
//! `/*` and `/**` wildcard patterns), and park a `/meta/connect`
//! request that the broker holds open until a publish routes data to
//! the session or the hold budget elapses. Delivery is best-effort and
//! in-memory; nothing is persisted.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP long-polling)
//!     │
//!     ├── Protocol Handlers (api/)
//!     │
//!     ├── Broker (service/)
//!     ├── MessageRouter (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── SessionRegistry (domain/)
//!     ├── ChannelRegistry (domain/)
//!     │
//!     └── LongPollingTransport (polling/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod polling;
pub mod service;
