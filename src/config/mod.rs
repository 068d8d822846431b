//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file ──────────→ loader.rs (fills unset variables only)
//! command-line flags ─┐
//! environment vars ───┼→ cli.rs (clap, flags beat env beat defaults)
//! defaults ───────────┘
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow running with no flags at all
//! - Validation separates syntactic (clap) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_from, load_env_file, ConfigError};
pub use schema::{
    ListenerConfig, LoggingConfig, ObservabilityConfig, ProxyConfig, TimeoutConfig,
    UpstreamConfig,
};
