//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Open recorder → Bind listener → Serve
//!
//! Shutdown:
//!     signals.rs: SIGTERM/SIGINT → Shutdown::trigger
//!     server stops accepting → open connections finish (bounded by drain_secs)
//!     drain.rs: in-flight count checked → close recorder
//! ```
//!
//! # Design Decisions
//! - Traffic sinks close only after the server has stopped
//! - Drain has a deadline: connections still open when it passes are
//!   abandoned and shutdown proceeds

pub mod drain;
pub mod shutdown;
pub mod signals;

pub use drain::{InFlight, RelayGuard};
pub use shutdown::Shutdown;
