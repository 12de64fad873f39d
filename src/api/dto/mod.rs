//! Data Transfer Objects for protocol request/response serialization.
//!
//! The wire format follows CometD conventions: camelCase field names,
//! array-of-message bodies, and absent-means-unset optional fields.

pub mod meta_dto;

pub use meta_dto::{Advice, MetaMessage, Reconnect};
