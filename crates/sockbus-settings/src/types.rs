//! Settings groups: server network, socket timings, and bus backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Which bus backend the gateway drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// In-process broadcast channels. No external services; used for
    /// local development and tests.
    #[default]
    Memory,
    /// Redis pub/sub (store-based backend).
    Redis,
    /// NATS core pub/sub (broker-based backend).
    Nats,
}

impl BusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
            Self::Nats => "nats",
        }
    }
}

impl std::str::FromStr for BusKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "nats" => Ok(Self::Nats),
            other => Err(format!("unknown bus driver {other:?}")),
        }
    }
}

/// Server network and shutdown settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port. 0 binds an ephemeral port.
    pub port: u16,
    /// Upper bound on graceful shutdown, in milliseconds.
    pub graceful_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8379,
            graceful_timeout_ms: 15_000,
        }
    }
}

/// Per-connection socket supervision settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SocketSettings {
    /// Interval between liveness probes sent to the client, in ms.
    pub ping_interval_ms: u64,
    /// How long the server waits for a liveness acknowledgment before
    /// the connection is considered dead, in ms. Must exceed
    /// `ping_interval_ms` so a single missed probe cycle does not
    /// disconnect a client.
    pub pong_wait_ms: u64,
    /// Timeout for writing a single frame to the client, in ms.
    pub write_wait_ms: u64,
    /// Maximum size of frames accepted from the client, in bytes.
    pub read_limit_bytes: usize,
    /// Capacity of the per-connection outbound frame queue.
    pub send_queue: usize,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            ping_interval_ms: 25_000,
            pong_wait_ms: 30_000,
            write_wait_ms: 20_000,
            read_limit_bytes: 4096,
            send_queue: 64,
        }
    }
}

impl SocketSettings {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }
}

/// Bus backend selection and addresses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct BusSettings {
    /// Backend driver.
    pub driver: BusKind,
    /// Redis connection URL.
    pub redis_url: String,
    /// NATS server address.
    pub nats_url: String,
    /// Capacity of each subscription's delivery channel.
    pub delivery_buffer: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            driver: BusKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            nats_url: "127.0.0.1:4222".to_string(),
            delivery_buffer: 64,
        }
    }
}

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Settings {
    pub server: ServerSettings,
    pub socket: SocketSettings,
    pub bus: BusSettings,
}

impl Settings {
    /// Reject inconsistent configurations before anything starts.
    pub fn validate(&self) -> Result<()> {
        if self.socket.pong_wait_ms <= self.socket.ping_interval_ms {
            return Err(SettingsError::Invalid(format!(
                "pong_wait_ms ({}) must exceed ping_interval_ms ({})",
                self.socket.pong_wait_ms, self.socket.ping_interval_ms
            )));
        }
        if self.socket.send_queue == 0 {
            return Err(SettingsError::Invalid(
                "send_queue must be at least 1".into(),
            ));
        }
        if self.bus.delivery_buffer == 0 {
            return Err(SettingsError::Invalid(
                "delivery_buffer must be at least 1".into(),
            ));
        }
        match self.bus.driver {
            BusKind::Redis if self.bus.redis_url.is_empty() => Err(SettingsError::Invalid(
                "redis_url cannot be empty with the redis driver".into(),
            )),
            BusKind::Nats if self.bus.nats_url.is_empty() => Err(SettingsError::Invalid(
                "nats_url cannot be empty with the nats driver".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.server.port, 8379);
        assert_eq!(settings.socket.ping_interval_ms, 25_000);
        assert_eq!(settings.socket.pong_wait_ms, 30_000);
        assert_eq!(settings.socket.read_limit_bytes, 4096);
        assert_eq!(settings.bus.driver, BusKind::Memory);
    }

    #[test]
    fn pong_wait_must_exceed_ping_interval() {
        let mut settings = Settings::default();
        settings.socket.pong_wait_ms = settings.socket.ping_interval_ms;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn redis_driver_requires_url() {
        let mut settings = Settings::default();
        settings.bus.driver = BusKind::Redis;
        settings.bus.redis_url.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn bus_kind_parses() {
        assert_eq!("redis".parse::<BusKind>().unwrap(), BusKind::Redis);
        assert_eq!("NATS".parse::<BusKind>().unwrap(), BusKind::Nats);
        assert_eq!("memory".parse::<BusKind>().unwrap(), BusKind::Memory);
        assert!("kafka".parse::<BusKind>().is_err());
    }

    #[test]
    fn bus_kind_round_trips_through_serde() {
        let json = serde_json::to_string(&BusKind::Redis).unwrap();
        assert_eq!(json, "\"redis\"");
        let parsed: BusKind = serde_json::from_str("\"nats\"").unwrap();
        assert_eq!(parsed, BusKind::Nats);
    }

    #[test]
    fn durations_convert_from_millis() {
        let socket = SocketSettings::default();
        assert_eq!(socket.ping_interval(), Duration::from_millis(25_000));
        assert_eq!(socket.pong_wait(), Duration::from_millis(30_000));
    }
}
