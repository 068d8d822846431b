//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! Every section has defaults so a bare `ProxyConfig::default()` is a working
//! setup that forwards to the public OpenAI endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default upstream the relay forwards to.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1";

/// Root configuration for the relay.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Upstream API the relay forwards to.
    pub upstream: UpstreamConfig,

    /// Traffic recording toggles and sinks.
    pub logging: LoggingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Process diagnostics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to. Never carries a trailing slash.
    pub base_url: String,

    /// Credential injected as `Authorization: Bearer <key>` when the caller
    /// does not supply its own.
    pub api_key: Option<String>,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for upstream traffic.
    pub use_system_proxy: bool,
}

impl UpstreamConfig {
    /// Build an upstream section, normalizing the base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            api_key: api_key.filter(|k| !k.is_empty()),
            use_system_proxy: true,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_URL, None)
    }
}

/// Strip the trailing slash so `base_url + path` never doubles it.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// Traffic recording configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Record every inbound request.
    pub log_requests: bool,

    /// Record every upstream response (one record per chunk when streaming).
    pub log_responses: bool,

    /// Echo records to standard output.
    pub log_to_stdout: bool,

    /// Append records to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: true,
            log_to_stdout: true,
            log_file: None,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upstream round trip, including the response body, in seconds.
    pub upstream_secs: u64,

    /// Inbound request body read in seconds.
    pub client_read_secs: u64,

    /// Maximum wait for in-flight relays at shutdown, in seconds.
    pub drain_secs: u64,
}

impl TimeoutConfig {
    pub fn upstream(&self) -> Duration {
        Duration::from_secs(self.upstream_secs)
    }

    pub fn client_read(&self) -> Duration {
        Duration::from_secs(self.client_read_secs)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 120,
            client_read_secs: 120,
            drain_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive for process diagnostics.
    pub log_filter: String,

    /// Prometheus scrape endpoint. Metrics are off when unset.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "api_relay=info,tower_http=info".to_string(),
            metrics_address: None,
        }
    }
}
