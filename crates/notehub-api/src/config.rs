//! Server configuration.
//!
//! Values come from the environment (after `.env` is loaded by the binary),
//! falling back to [`notehub_core::defaults`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `SUBSCRIBER_BUFFER` | `64` |
//! | `WS_PING_INTERVAL_SECS` | `30` |
//! | `CORS_ORIGINS` | `*` |

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use notehub_core::defaults;

/// Shortest keepalive period accepted.
pub const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each WebSocket subscriber's queue.
    pub subscriber_buffer: usize,
    pub ws_ping_interval: Duration,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            subscriber_buffer: defaults::SUBSCRIBER_BUFFER,
            ws_ping_interval: Duration::from_secs(defaults::WS_PING_INTERVAL_SECS),
            cors_origins: Vec::new(),
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read configuration from environment variables. Unparseable values
    /// fall back to the default with a warning.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(default.host),
            port: parse_env("PORT", default.port),
            subscriber_buffer: parse_env("SUBSCRIBER_BUFFER", default.subscriber_buffer).max(1),
            ws_ping_interval: Duration::from_secs(parse_env(
                "WS_PING_INTERVAL_SECS",
                defaults::WS_PING_INTERVAL_SECS,
            ))
            .max(MIN_PING_INTERVAL),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),
            max_body_bytes: default.max_body_bytes,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer.max(1);
        self
    }

    /// Keepalive period, at least one second.
    pub fn with_ws_ping_interval(mut self, interval: Duration) -> Self {
        self.ws_ping_interval = interval.max(MIN_PING_INTERVAL);
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Parsed CORS origins; `None` allows any origin. Invalid entries are
    /// skipped with a warning.
    pub fn allowed_origins(&self) -> Option<Vec<HeaderValue>> {
        if self.cors_origins.is_empty() {
            return None;
        }
        let origins = self
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect();
        Some(origins)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Split a comma list of origins. `*` (or an empty list) means any origin.
fn split_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
