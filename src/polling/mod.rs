//! Long-polling transport layer.
//!
//! The transport holds `/meta/connect` requests open until a payload
//! arrives for the session or the hold deadline passes. One parked
//! future per session, woken by the message router.

pub mod transport;

pub use transport::{LongPollingTransport, PollOutcome};
