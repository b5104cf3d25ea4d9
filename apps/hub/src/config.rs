// Runtime configuration
//
// Values come from the process environment (optionally seeded from a
// `.env` file by the binary). Every setting has a default so the hub
// starts with no configuration at all.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default keep-alive period
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Default delay between a close and the next connection attempt
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3_000;

/// Default number of consecutive failed attempts before giving up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Default number of `failed -> pending` retries allowed per task
pub const DEFAULT_MAX_TASK_RETRIES: u32 = 3;

/// Capacity of the registry's domain event bus
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

const DEFAULT_HOST: &str = "localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Settings for the transport channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub url: String,
    pub heartbeat_interval: Duration,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl TransportConfig {
    /// Channel endpoint for a host, e.g. `ws://localhost:3000/ws/orchestration`
    pub fn endpoint_for_host(host: &str) -> String {
        format!("ws://{}/ws/orchestration", host)
    }

    pub fn for_host(host: &str) -> Self {
        Self {
            url: Self::endpoint_for_host(host),
            ..Self::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: Self::endpoint_for_host(DEFAULT_HOST),
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Settings for the orchestration registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Upper bound on `retry_count`; a failed task at this count cannot
    /// be re-queued
    pub max_task_retries: u32,
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_task_retries: DEFAULT_MAX_TASK_RETRIES,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Top-level configuration for the hub binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub registry: RegistryConfig,
    pub http_addr: SocketAddr,
}

impl AppConfig {
    /// Reads configuration from the process environment
    ///
    /// # Environment
    /// * `ORCHESTRATION_WS_URL` - full channel URL (wins over the host)
    /// * `ORCHESTRATION_HOST` - host used to derive the channel URL
    /// * `HEARTBEAT_INTERVAL_MS`, `RECONNECT_INTERVAL_MS`, `MAX_RECONNECT_ATTEMPTS`
    /// * `TASK_MAX_RETRIES`
    /// * `HTTP_ADDR` - bind address of the status API
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("ORCHESTRATION_WS_URL") {
            Some(url) => url,
            None => {
                let host = lookup("ORCHESTRATION_HOST").unwrap_or_else(|| {
                    tracing::warn!("ORCHESTRATION_HOST not set, using {}", DEFAULT_HOST);
                    DEFAULT_HOST.to_string()
                });
                TransportConfig::endpoint_for_host(&host)
            }
        };

        let transport = TransportConfig {
            url,
            heartbeat_interval: interval_or(
                &lookup,
                "HEARTBEAT_INTERVAL_MS",
                DEFAULT_HEARTBEAT_INTERVAL_MS,
            )?,
            reconnect_interval: interval_or(
                &lookup,
                "RECONNECT_INTERVAL_MS",
                DEFAULT_RECONNECT_INTERVAL_MS,
            )?,
            max_reconnect_attempts: parse_or(
                &lookup,
                "MAX_RECONNECT_ATTEMPTS",
                DEFAULT_MAX_RECONNECT_ATTEMPTS,
            )?,
        };

        let registry = RegistryConfig {
            max_task_retries: parse_or(&lookup, "TASK_MAX_RETRIES", DEFAULT_MAX_TASK_RETRIES)?,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        };

        let http_addr = parse_or(&lookup, "HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        Ok(Self {
            transport,
            registry,
            http_addr,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Parses a millisecond interval; zero is rejected
fn interval_or<F>(lookup: &F, key: &str, default_ms: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default_ms)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
        }),
        ms => Ok(Duration::from_millis(ms)),
    }
}
