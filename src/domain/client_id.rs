//! Type-safe client/session identifier.
//!
//! [`ClientId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that session identifiers cannot be confused with other
//! UUIDs. On the wire it is the Bayeux `clientId` field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a connected client session.
///
/// Wraps a UUID v4. Generated once at handshake time and immutable
/// thereafter. Used as the dictionary key in
/// [`super::SessionRegistry`], as the subscriber handle in
/// [`super::ChannelRegistry`], and echoed to clients as `clientId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    /// Creates a new random `ClientId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ClientId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Parses a `ClientId` from its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`uuid::Error`] if `s` is not a valid UUID string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        s.parse::<uuid::Uuid>().map(Self)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for ClientId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ClientId> for uuid::Uuid {
    fn from(id: ClientId) -> Self {
        id.0
    }
}
