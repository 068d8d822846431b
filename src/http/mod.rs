//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → relay.rs (one request lifecycle)
//!         → request.rs (correlation id, upstream URL, outbound headers)
//!         → upstream call (reqwest, bounded round trip)
//!         → response.rs (headers, streaming vs buffered body)
//!     → Send to client
//! ```

pub mod error;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use error::RelayError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
