//! Concurrent session storage keyed by client ID.
//!
//! [`SessionRegistry`] stores every handshaken session in a `HashMap`
//! behind a [`tokio::sync::RwLock`]. Entries are `Arc<Session>` with
//! their own interior locking, so registry lookups stay cheap and a
//! parked long poll never holds the outer map lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{ClientId, Session};
use crate::error::BrokerError;

/// Central store for all live client sessions.
///
/// # Concurrency
///
/// - Lookups take the outer read lock only long enough to clone the
///   `Arc`; all queue and subscription work happens on the session's
///   own lock.
/// - [`SessionRegistry::sweep`] snapshots idle candidates under the
///   read lock and re-checks them under the write lock, so a session
///   that turns active in between is spared.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ClientId, Arc<Session>>>,
    queue_capacity: usize,
}

impl SessionRegistry {
    /// Creates an empty registry whose sessions use the given delivery
    /// queue capacity.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            queue_capacity,
        }
    }

    /// Mints a fresh client ID and registers a session for it.
    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(ClientId::new(), self.queue_capacity));
        let mut map = self.sessions.write().await;
        map.insert(session.client_id(), Arc::clone(&session));
        session
    }

    /// Returns the session for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if no session with the
    /// given ID exists.
    pub async fn get(&self, client_id: ClientId) -> Result<Arc<Session>, BrokerError> {
        let map = self.sessions.read().await;
        map.get(&client_id)
            .cloned()
            .ok_or(BrokerError::SessionUnknown)
    }

    /// Removes a session and marks it closed.
    ///
    /// Other holders of the `Arc` (a parked poll, the router) observe
    /// the closure through [`Session::is_closed`].
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if no session with the
    /// given ID exists.
    pub async fn remove(&self, client_id: ClientId) -> Result<Arc<Session>, BrokerError> {
        let session = {
            let mut map = self.sessions.write().await;
            map.remove(&client_id)
                .ok_or(BrokerError::SessionUnknown)?
        };
        session.mark_closed().await;
        Ok(session)
    }

    /// Evicts every session idle for at least `max_idle`, returning the
    /// removed sessions so the caller can release their subscriptions.
    ///
    /// A session parked in a long poll refreshes its activity stamp at
    /// poll entry and exit, so it only expires once the client stops
    /// reconnecting.
    pub async fn sweep(&self, now: Instant, max_idle: Duration) -> Vec<Arc<Session>> {
        let mut candidates = Vec::new();
        {
            let map = self.sessions.read().await;
            for (client_id, session) in map.iter() {
                if now.duration_since(session.last_seen().await) >= max_idle {
                    candidates.push(*client_id);
                }
            }
        }

        let mut removed = Vec::with_capacity(candidates.len());
        if !candidates.is_empty() {
            let mut map = self.sessions.write().await;
            for client_id in candidates {
                let still_idle = match map.get(&client_id) {
                    Some(session) => {
                        now.duration_since(session.last_seen().await) >= max_idle
                    }
                    None => false,
                };
                if still_idle && let Some(session) = map.remove(&client_id) {
                    removed.push(session);
                }
            }
        }
        for session in &removed {
            session.mark_closed().await;
        }
        removed
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
