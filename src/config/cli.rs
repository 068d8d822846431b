//! Command-line surface.
//!
//! Every flag falls back to an environment variable; an explicit flag always
//! wins over the environment, and the environment wins over the default.
//! The boolean logging switches read their variables leniently: a value that
//! is not a boolean is reported and the default is used.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::builder::{BoolishValueParser, TypedValueParser};
use clap::{ArgAction, CommandFactory, Parser};

use crate::config::schema::{
    ListenerConfig, LoggingConfig, ObservabilityConfig, ProxyConfig,
    TimeoutConfig, UpstreamConfig, DEFAULT_UPSTREAM_URL,
};

#[derive(Debug, Parser)]
#[command(name = "api-relay")]
#[command(about = "Transparent recording relay in front of an HTTP API", long_about = None)]
pub struct Cli {
    /// Port for the relay to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Base URL of the upstream API
    #[arg(short = 'u', long = "url", env = "OPENAI_BASE_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub url: String,

    /// Credential injected when the caller sends no Authorization header
    #[arg(short = 'k', long = "key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Ignore HTTP_PROXY/HTTPS_PROXY when connecting upstream
    #[arg(long, env = "RELAY_NO_SYSTEM_PROXY")]
    pub no_system_proxy: bool,

    /// Enable request logging [env: LOG_REQUESTS] [default: true]
    #[arg(
        short = 'r',
        long = "req",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub log_requests: Option<bool>,

    /// Enable response logging [env: LOG_RESPONSES] [default: true]
    #[arg(
        short = 's',
        long = "resp",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub log_responses: Option<bool>,

    /// Echo traffic records to standard output [env: LOG_TO_STDOUT] [default: true]
    #[arg(
        short = 'o',
        long = "stdout",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub log_to_stdout: Option<bool>,

    /// Append traffic records to this file
    #[arg(short = 'f', long = "file", env = "REQUEST_LOG_FILE")]
    pub file: Option<PathBuf>,

    /// Upstream round-trip timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 120)]
    pub upstream_timeout: u64,

    /// Seconds open connections get to finish after a shutdown signal
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout: u64,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<SocketAddr>,

    /// Diagnostics filter (tracing EnvFilter syntax)
    #[arg(long, env = "RUST_LOG", default_value = "api_relay=info,tower_http=info")]
    pub log_filter: String,
}

impl Cli {
    /// Turn parsed arguments into a configuration. Not yet validated.
    pub fn into_config(self) -> ProxyConfig {
        ProxyConfig {
            listener: ListenerConfig {
                host: self.host,
                port: self.port,
            },
            upstream: UpstreamConfig {
                use_system_proxy: !self.no_system_proxy,
                ..UpstreamConfig::new(self.url, self.key)
            },
            logging: LoggingConfig {
                log_requests: self
                    .log_requests
                    .unwrap_or_else(|| env_switch("LOG_REQUESTS", true, env_lookup)),
                log_responses: self
                    .log_responses
                    .unwrap_or_else(|| env_switch("LOG_RESPONSES", true, env_lookup)),
                log_to_stdout: self
                    .log_to_stdout
                    .unwrap_or_else(|| env_switch("LOG_TO_STDOUT", true, env_lookup)),
                log_file: self.file.filter(|p| !p.as_os_str().is_empty()),
            },
            timeouts: TimeoutConfig {
                upstream_secs: self.upstream_timeout,
                drain_secs: self.drain_timeout,
                ..TimeoutConfig::default()
            },
            observability: ObservabilityConfig {
                log_filter: self.log_filter,
                metrics_address: self.metrics_address,
            },
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Boolean switch from the environment. Unset or empty means `default`; an
/// unrecognised value is reported on stderr (logging is not up yet) and
/// falls back to `default`.
fn env_switch(name: &str, default: bool, lookup: impl Fn(&str) -> Option<String>) -> bool {
    let Some(raw) = lookup(name).filter(|v| !v.is_empty()) else {
        return default;
    };
    match BoolishValueParser::new().parse_ref(&Cli::command(), None, OsStr::new(&raw)) {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Warning: invalid value {raw:?} for {name}, using default: {default}");
            default
        }
    }
}
