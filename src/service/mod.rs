//! Service layer: business logic orchestration.
//!
//! [`Broker`] coordinates the session lifecycle, delegates fan-out to
//! the [`MessageRouter`], and emits events through the
//! [`super::domain::EventBus`].

pub mod broker;
pub mod router;

pub use broker::Broker;
pub use router::MessageRouter;
