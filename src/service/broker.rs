//! Broker facade: composes registries, router and transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::BrokerConfig;
use crate::domain::{
    BrokerEvent, ChannelRegistry, ClientId, EventBus, Session, SessionCloseReason,
    SessionRegistry, channel_name,
};
use crate::error::BrokerError;
use crate::polling::{LongPollingTransport, PollOutcome};
use crate::service::MessageRouter;

/// Protocol version this broker speaks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// The single connection type this broker supports.
pub const CONNECTION_TYPE_LONG_POLLING: &str = "long-polling";

/// Top-level entry point for protocol handlers and server-side
/// publishers.
///
/// The broker owns every piece of shared state: the session and channel
/// registries, the message router, the long-poll transport and the
/// event bus. It is constructed once at startup and shared as
/// `Arc<Broker>`; there is no ambient global state.
///
/// Lifecycle methods follow the protocol state machine: `handshake`
/// creates a session, `subscribe`/`unsubscribe` attach it to channels,
/// `connect` parks the long poll, and `disconnect` (or the idle
/// sweeper) tears the session down.
#[derive(Debug, Clone)]
pub struct Broker {
    sessions: Arc<SessionRegistry>,
    channels: Arc<ChannelRegistry>,
    router: MessageRouter,
    transport: LongPollingTransport,
    event_bus: EventBus,
    max_interval: Duration,
    sweep_interval: Duration,
}

impl Broker {
    /// Builds a broker from the given configuration.
    #[must_use]
    pub fn new(config: &BrokerConfig) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.session_queue_capacity));
        let channels = Arc::new(ChannelRegistry::new(config.channel_retention));
        let event_bus = EventBus::new(config.event_bus_capacity);
        let router = MessageRouter::new(
            Arc::clone(&sessions),
            Arc::clone(&channels),
            event_bus.clone(),
            config.deliver_to_self,
        );
        let transport = LongPollingTransport::new(config.timeout);

        Self {
            sessions,
            channels,
            router,
            transport,
            event_bus,
            max_interval: config.max_interval,
            sweep_interval: config.sweep_interval,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Registers an observer for broker events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<BrokerEvent> {
        self.event_bus.subscribe()
    }

    /// Opens a session for a client that passed protocol negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::VersionMismatch`] if `minimum_version`
    /// is not `"1.0"`, and [`BrokerError::ConnectionTypeUnsupported`]
    /// if the client does not offer long-polling.
    pub async fn handshake(
        &self,
        minimum_version: Option<&str>,
        supported_connection_types: Option<&[String]>,
    ) -> Result<Arc<Session>, BrokerError> {
        if minimum_version != Some(PROTOCOL_VERSION) {
            return Err(BrokerError::VersionMismatch(
                minimum_version.map(str::to_string),
            ));
        }

        let offered = supported_connection_types.unwrap_or_default();
        if !offered
            .iter()
            .any(|kind| kind == CONNECTION_TYPE_LONG_POLLING)
        {
            return Err(BrokerError::ConnectionTypeUnsupported(offered.to_vec()));
        }

        let session = self.sessions.create().await;
        let client_id = session.client_id();

        let _ = self.event_bus.publish(BrokerEvent::SessionOpened {
            client_id,
            timestamp: Utc::now(),
        });
        tracing::info!(client_id = %client_id, "session opened");

        Ok(session)
    }

    /// Attaches the session to each named channel or pattern.
    ///
    /// The whole batch is validated before any subscription is applied.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if `client_id` does not
    /// resolve, or [`BrokerError::ChannelInvalid`] if any name fails
    /// validation.
    pub async fn subscribe(
        &self,
        client_id: ClientId,
        subscriptions: &[String],
    ) -> Result<(), BrokerError> {
        let session = self.sessions.get(client_id).await?;
        for name in subscriptions {
            channel_name::validate_subscribe_name(name)?;
        }

        for name in subscriptions {
            let outcome = self.channels.subscribe(name, client_id).await;
            if outcome.channel_created {
                let _ = self.event_bus.publish(BrokerEvent::ChannelAdded {
                    channel: name.clone(),
                    timestamp: Utc::now(),
                });
            }
            if outcome.newly_subscribed {
                session.add_subscription(name).await;
                let _ = self.event_bus.publish(BrokerEvent::Subscribed {
                    client_id,
                    channel: name.clone(),
                    timestamp: Utc::now(),
                });
                tracing::info!(client_id = %client_id, channel = name.as_str(), "subscribed");
            }
        }

        session.touch(Instant::now()).await;
        Ok(())
    }

    /// Detaches the session from each named channel or pattern.
    ///
    /// Unsubscribing a channel the session is not attached to is a
    /// no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if `client_id` does not
    /// resolve, or [`BrokerError::ChannelInvalid`] if any name fails
    /// validation.
    pub async fn unsubscribe(
        &self,
        client_id: ClientId,
        subscriptions: &[String],
    ) -> Result<(), BrokerError> {
        let session = self.sessions.get(client_id).await?;
        for name in subscriptions {
            channel_name::validate_subscribe_name(name)?;
        }

        for name in subscriptions {
            if self.channels.unsubscribe(name, client_id).await {
                session.remove_subscription(name).await;
                let _ = self.event_bus.publish(BrokerEvent::Unsubscribed {
                    client_id,
                    channel: name.clone(),
                    timestamp: Utc::now(),
                });
                tracing::info!(client_id = %client_id, channel = name.as_str(), "unsubscribed");
            }
        }

        session.touch(Instant::now()).await;
        Ok(())
    }

    /// Marks the session as active without any other effect.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if `client_id` does not
    /// resolve.
    pub async fn touch_session(&self, client_id: ClientId) -> Result<(), BrokerError> {
        let session = self.sessions.get(client_id).await?;
        session.touch(Instant::now()).await;
        Ok(())
    }

    /// Parks a long poll for the session until data arrives or the
    /// hold deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if `client_id` does not
    /// resolve, or [`BrokerError::DuplicateConnect`] if a poll for the
    /// session is already pending.
    pub async fn connect(
        &self,
        client_id: ClientId,
        requested_timeout: Option<Duration>,
    ) -> Result<PollOutcome, BrokerError> {
        let session = self.sessions.get(client_id).await?;
        self.transport.await_messages(&session, requested_timeout).await
    }

    /// Tears the session down and releases its subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::SessionUnknown`] if `client_id` does not
    /// resolve.
    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), BrokerError> {
        let session = self.sessions.remove(client_id).await?;
        let subscriptions = session.subscriptions().await;
        self.channels.release(client_id, &subscriptions).await;

        let _ = self.event_bus.publish(BrokerEvent::SessionClosed {
            client_id,
            reason: SessionCloseReason::Disconnect,
            timestamp: Utc::now(),
        });
        tracing::info!(client_id = %client_id, "session disconnected");

        Ok(())
    }

    /// Publishes `payload` to `channel`, fanning it out to matching
    /// subscribers. This is also the entry point for server-side
    /// publishers outside the HTTP surface.
    ///
    /// Returns the number of sessions the payload was queued for.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ChannelInvalid`] if `channel` is not a
    /// valid concrete channel name.
    pub async fn publish(
        &self,
        channel: &str,
        payload: serde_json::Value,
        sender: Option<ClientId>,
    ) -> Result<usize, BrokerError> {
        self.router.publish(channel, payload, sender).await
    }

    /// Registers a channel ahead of any subscriber or publish.
    ///
    /// Returns `true` on first creation.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ChannelInvalid`] if `name` fails
    /// validation.
    pub async fn create_channel(&self, name: &str) -> Result<bool, BrokerError> {
        channel_name::validate_subscribe_name(name)?;
        let created = self.channels.ensure(name).await;
        if created {
            let _ = self.event_bus.publish(BrokerEvent::ChannelAdded {
                channel: name.to_string(),
                timestamp: Utc::now(),
            });
            tracing::info!(channel = name, "channel created");
        }
        Ok(created)
    }

    /// Returns the number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Returns the number of registered channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.len().await
    }

    /// Runs one idle-eviction cycle at `now`, returning the number of
    /// sessions removed.
    pub async fn sweep_now(&self, now: Instant) -> usize {
        let removed = self.sessions.sweep(now, self.max_interval).await;
        for session in &removed {
            let client_id = session.client_id();
            let subscriptions = session.subscriptions().await;
            self.channels.release(client_id, &subscriptions).await;

            let _ = self.event_bus.publish(BrokerEvent::SessionClosed {
                client_id,
                reason: SessionCloseReason::IdleTimeout,
                timestamp: Utc::now(),
            });
            tracing::info!(client_id = %client_id, "session evicted after idle timeout");
        }
        removed.len()
    }

    /// Spawns the periodic idle sweeper. The task runs until aborted.
    pub fn spawn_sweeper(broker: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = broker.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = broker.sweep_now(Instant::now()).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "idle sweep evicted sessions");
                }
            }
        })
    }
}
