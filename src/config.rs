//! Broker configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults matching the CometD
//! conventions the broker speaks.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::ChannelRetention;

/// Top-level broker configuration.
///
/// Loaded once at startup via [`BrokerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:1025`).
    pub listen_addr: SocketAddr,

    /// Path prefix the meta routes are nested under (e.g. `/notifications`).
    pub base_path: String,

    /// Maximum duration a `/meta/connect` is held open waiting for data.
    pub timeout: Duration,

    /// Idle duration after which a silent session is swept away. Must
    /// exceed `timeout`, otherwise parked polls would be evicted.
    pub max_interval: Duration,

    /// How often the idle sweeper runs.
    pub sweep_interval: Duration,

    /// Interval advertised to clients between connect attempts.
    pub client_interval: Duration,

    /// HTTP status returned for an overlapping `/meta/connect`.
    pub duplicate_connect_status: u16,

    /// Whether a publisher's own session receives its publishes.
    pub deliver_to_self: bool,

    /// What happens to channels whose last subscriber leaves.
    pub channel_retention: ChannelRetention,

    /// Per-session delivery queue bound; oldest payloads are dropped
    /// beyond it.
    pub session_queue_capacity: usize,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,
}

impl BrokerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:1025".to_string())
            .parse()?;

        let base_path =
            std::env::var("BROKER_BASE_PATH").unwrap_or_else(|_| "/notifications".to_string());

        let timeout = Duration::from_millis(parse_env("BROKER_TIMEOUT_MS", 20_000));
        let max_interval = Duration::from_millis(parse_env("BROKER_MAX_INTERVAL_MS", 60_000));
        let sweep_interval = Duration::from_millis(parse_env("BROKER_SWEEP_INTERVAL_MS", 1_000));
        let client_interval = Duration::from_millis(parse_env("BROKER_CLIENT_INTERVAL_MS", 0));

        let duplicate_connect_status = parse_env("BROKER_DUPLICATE_CONNECT_STATUS", 409);
        let deliver_to_self = parse_env_bool("BROKER_DELIVER_TO_SELF", true);
        let channel_retention = parse_env("BROKER_CHANNEL_RETENTION", ChannelRetention::Retain);
        let session_queue_capacity = parse_env("BROKER_SESSION_QUEUE_CAPACITY", 500);

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 10_000);

        Ok(Self {
            listen_addr,
            base_path,
            timeout,
            max_interval,
            sweep_interval,
            client_interval,
            duplicate_connect_status,
            deliver_to_self,
            channel_retention,
            session_queue_capacity,
            event_bus_capacity,
        })
    }

    /// Long-poll hold budget in milliseconds, as advertised in advice.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Inter-poll delay in milliseconds, as advertised in advice.
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.client_interval.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for BrokerConfig {
    /// Defaults mirroring [`BrokerConfig::from_env`] with no variables
    /// set, without touching the process environment. Used by tests.
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 1025)),
            base_path: "/notifications".to_string(),
            timeout: Duration::from_millis(20_000),
            max_interval: Duration::from_millis(60_000),
            sweep_interval: Duration::from_millis(1_000),
            client_interval: Duration::ZERO,
            duplicate_connect_status: 409,
            deliver_to_self: true,
            channel_retention: ChannelRetention::Retain,
            session_queue_capacity: 500,
            event_bus_capacity: 10_000,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
