//! Concurrent channel storage mapping names to subscriber sets.
//!
//! [`ChannelRegistry`] keeps every known channel (concrete names and
//! wildcard patterns alike) in a `HashMap` behind a single
//! [`tokio::sync::RwLock`]. Subscriber sets are small and every
//! mutation is O(1), so per-channel locks would add machinery without
//! buying concurrency. Publish fan-out only takes the read lock and
//! copies the matching IDs out.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use tokio::sync::RwLock;

use super::ClientId;
use super::channel_name::wild_names;

/// What happens to a channel once its last subscriber leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelRetention {
    /// Keep the channel registered with an empty subscriber set.
    #[default]
    Retain,
    /// Remove the channel as soon as it has no subscribers.
    DropEmpty,
}

impl FromStr for ChannelRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(Self::Retain),
            "drop-empty" => Ok(Self::DropEmpty),
            other => Err(format!(
                "unknown retention policy {other:?}, expected retain or drop-empty"
            )),
        }
    }
}

/// Result of registering a subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOutcome {
    /// `true` if the channel did not exist before this call.
    pub channel_created: bool,
    /// `false` if the client was already subscribed.
    pub newly_subscribed: bool,
}

/// Central store mapping channel names to their subscribers.
///
/// Wildcard matching works by expansion: a publish to a concrete name
/// looks up the name itself plus every pattern from
/// [`wild_names`], so resolution cost scales with channel depth rather
/// than with the number of registered channels.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, HashSet<ClientId>>>,
    retention: ChannelRetention,
}

impl ChannelRegistry {
    /// Creates an empty registry with the given retention policy.
    #[must_use]
    pub fn new(retention: ChannelRetention) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Registers `name` if absent, returning `true` on first creation.
    pub async fn ensure(&self, name: &str) -> bool {
        {
            let map = self.channels.read().await;
            if map.contains_key(name) {
                return false;
            }
        }
        let mut map = self.channels.write().await;
        match map.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(HashSet::new());
                true
            }
        }
    }

    /// Adds `client_id` as a subscriber of `name`, creating the channel
    /// if needed.
    pub async fn subscribe(&self, name: &str, client_id: ClientId) -> SubscribeOutcome {
        let mut map = self.channels.write().await;
        match map.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => SubscribeOutcome {
                channel_created: false,
                newly_subscribed: occupied.get_mut().insert(client_id),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(HashSet::from([client_id]));
                SubscribeOutcome {
                    channel_created: true,
                    newly_subscribed: true,
                }
            }
        }
    }

    /// Drops `client_id` from `name`, returning `false` if it was not
    /// subscribed. Under [`ChannelRetention::DropEmpty`] the channel is
    /// removed once its subscriber set empties.
    pub async fn unsubscribe(&self, name: &str, client_id: ClientId) -> bool {
        let mut map = self.channels.write().await;
        let Some(subscribers) = map.get_mut(name) else {
            return false;
        };
        let removed = subscribers.remove(&client_id);
        if removed && subscribers.is_empty() && self.retention == ChannelRetention::DropEmpty {
            map.remove(name);
        }
        removed
    }

    /// Returns every subscriber reached by a publish to the concrete
    /// channel `name`: direct subscribers plus those on any covering
    /// wildcard pattern, deduplicated.
    pub async fn matching_subscribers(&self, name: &str) -> HashSet<ClientId> {
        let patterns = wild_names(name);
        let map = self.channels.read().await;
        let mut matched = HashSet::new();
        if let Some(subscribers) = map.get(name) {
            matched.extend(subscribers.iter().copied());
        }
        for pattern in &patterns {
            if let Some(subscribers) = map.get(pattern.as_str()) {
                matched.extend(subscribers.iter().copied());
            }
        }
        matched
    }

    /// Removes `client_id` from each of the named channels, applying
    /// the retention policy. Used when a session ends.
    pub async fn release(&self, client_id: ClientId, channels: &[String]) {
        if channels.is_empty() {
            return;
        }
        let mut map = self.channels.write().await;
        for name in channels {
            let drop_now = match map.get_mut(name) {
                Some(subscribers) => {
                    subscribers.remove(&client_id);
                    subscribers.is_empty() && self.retention == ChannelRetention::DropEmpty
                }
                None => false,
            };
            if drop_now {
                map.remove(name);
            }
        }
    }

    /// Returns `true` if `name` is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.channels.read().await.contains_key(name)
    }

    /// Returns the number of registered channels.
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Returns `true` if no channels are registered.
    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(ChannelRetention::Retain)
    }
}
