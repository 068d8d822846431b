//! Traffic recording side channel.
//!
//! # Data Flow
//! ```text
//! relay handler
//!     → Recorder::record_request / record_response
//!     → format.rs (render one text block)
//!     → sink.rs (file and/or console, one lock per sink)
//! ```
//!
//! # Design Decisions
//! - Records observe traffic; they never touch the bytes relayed to clients
//! - Sink failures are logged and swallowed, never surfaced to the relay
//! - Streaming responses are recorded per transport chunk, so one SSE event
//!   may span several records and one record may hold several events

pub mod format;
pub mod sink;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode, Version};
use thiserror::Error;

use crate::config::LoggingConfig;
use crate::observability::metrics;

pub use format::{MAX_LOGGED_BODY, REDACTED_AUTHORIZATION};
pub use sink::{ConsoleSink, FileSink, RecordSink};

/// Error type for recorder setup.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to open traffic log {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes request and response records to every configured sink.
pub struct Recorder {
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl Recorder {
    /// Build the sink set described by the logging configuration.
    pub fn open(config: &LoggingConfig) -> Result<Self, RecorderError> {
        let mut sinks: Vec<Arc<dyn RecordSink>> = Vec::new();

        if let Some(path) = &config.log_file {
            let file = FileSink::open(path).map_err(|source| RecorderError::Open {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %file.path().display(), "Recording traffic to file");
            sinks.push(Arc::new(file));
        }

        if config.log_to_stdout {
            sinks.push(Arc::new(ConsoleSink::new()));
        }

        Ok(Self { sinks })
    }

    pub fn with_sinks(sinks: Vec<Arc<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    /// A recorder with no sinks; every call is a no-op.
    pub fn disabled() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Whether any sink would receive a record.
    pub fn is_active(&self) -> bool {
        !self.sinks.is_empty()
    }

    /// Record one inbound request. Request bodies are never truncated.
    pub fn record_request(
        &self,
        id: &str,
        method: &Method,
        path: &str,
        version: Version,
        headers: &HeaderMap,
        body: &[u8],
    ) {
        if !self.is_active() {
            return;
        }
        let record = format::format_request(id, method, path, version, headers, body);
        self.emit(id, &record);
    }

    /// Record one response unit: the whole buffered body or a single chunk
    /// of a streamed body.
    pub fn record_response(
        &self,
        id: &str,
        version: Version,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) {
        if !self.is_active() {
            return;
        }
        let record = format::format_response(id, version, status, headers, body);
        self.emit(id, &record);
    }

    fn emit(&self, id: &str, record: &str) {
        for sink in &self.sinks {
            if let Err(e) = sink.write_record(record) {
                tracing::warn!(
                    request_id = %id,
                    sink = sink.name(),
                    error = %e,
                    "Failed to write traffic record"
                );
                metrics::record_sink_failure(sink.name());
            }
        }
    }

    /// Flush and release every sink. Only call once in-flight relays have
    /// drained; records written afterwards are dropped.
    pub fn close(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.close() {
                tracing::warn!(sink = sink.name(), error = %e, "Failed to close traffic sink");
            }
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Recorder").field("sinks", &names).finish()
    }
}
