//! Transparent recording relay for HTTP APIs.
//!
//! Sits between a client and an upstream API (OpenAI-style by default),
//! forwards every request unchanged apart from credential injection, and
//! writes human-readable records of the traffic to a file and/or stdout.
//!
//! ```text
//!   client ──▶ http::server ──▶ http::relay ──▶ upstream API
//!                                   │
//!                                   ▼
//!                               recorder ──▶ file / stdout
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod recorder;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use recorder::Recorder;
